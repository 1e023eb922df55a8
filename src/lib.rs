//! Zipcode → weather relay with end-to-end tracing.
//!
//! Two roles share this crate:
//! - `edge` validates a Brazilian zipcode and forwards it
//! - `resolver` turns it into a city and its current temperature
//!
//! Trace context crosses the edge → resolver hop in W3C headers so both
//! roles land in one trace.

// Core subsystems
pub mod config;
pub mod http;

// Roles
pub mod edge;
pub mod resolver;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::RelayConfig;
pub use http::{HttpServer, Role};
pub use lifecycle::Shutdown;
