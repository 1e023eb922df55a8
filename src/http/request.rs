//! Inbound request validation.
//!
//! # Responsibilities
//! - Decode the JSON body into a [`ZipcodeRequest`]
//! - Enforce the zipcode shape (exactly 8 ASCII digits)
//! - Hand a validated [`Zipcode`] to the next stage
//!
//! # Design Decisions
//! - Both roles run the same validator; the resolver never trusts the edge
//! - Decoding failures and shape failures are distinct errors (400 vs 422)
//! - No trimming or normalization: what the caller sent is what is checked

use std::fmt;

use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::http::response::RelayError;

/// Number of characters in a valid zipcode.
pub const ZIPCODE_LEN: usize = 8;

/// Request ID header, set on entry and forwarded on the downstream hop.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The request ID header value, if the request carries one.
pub fn request_id(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers.get(X_REQUEST_ID)
}

/// Request ID for log fields.
pub fn request_id_str(headers: &HeaderMap) -> &str {
    request_id(headers)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

/// Wire shape of the request body accepted by both roles.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZipcodeRequest {
    #[serde(rename = "cep")]
    pub zipcode: String,
}

/// A zipcode that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zipcode(String);

impl Zipcode {
    /// Check the shape of `raw` and wrap it.
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        if raw.len() == ZIPCODE_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(RelayError::InvalidZipcode)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Zipcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Zipcode> for ZipcodeRequest {
    fn from(zipcode: &Zipcode) -> Self {
        Self {
            zipcode: zipcode.0.clone(),
        }
    }
}

/// Decode and validate a raw request body.
pub fn validate_body(body: &[u8]) -> Result<Zipcode, RelayError> {
    let request: ZipcodeRequest =
        serde_json::from_slice(body).map_err(|_| RelayError::MalformedBody)?;
    Zipcode::parse(&request.zipcode)
}
