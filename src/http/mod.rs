//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, role routes)
//!     → request.rs (decode body, validate zipcode, request ID)
//!     → [edge forwarder | resolver pipeline]
//!     → response.rs (error → status + plain-text body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{validate_body, Zipcode, ZipcodeRequest, X_REQUEST_ID};
pub use response::RelayError;
pub use server::{HealthStatus, HttpServer, Role};
