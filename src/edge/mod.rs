//! Edge role: the public entry point.
//!
//! # Data Flow
//! ```text
//! POST /weather {"cep": ".."}
//!     → handler.rs (extract trace context, open edge.inbound, validate)
//!     → forwarder.rs (open edge.call_downstream, inject headers, POST to resolver)
//!     → resolver status + body relayed verbatim
//! ```
//!
//! # Design Decisions
//! - Invalid zipcodes are rejected here and never reach the resolver
//! - Only transport failures are produced locally (502); every other
//!   status comes from the resolver

pub mod forwarder;
pub mod handler;

pub use forwarder::{Forwarder, ForwarderError, Relayed, CALL_DOWNSTREAM_SPAN};
pub use handler::{weather_handler, EdgeState, INBOUND_SPAN};
