//! Error taxonomy and its HTTP mapping.
//!
//! # Responsibilities
//! - Define the terminal errors a request can end in
//! - Map each error to exactly one HTTP status code
//! - Keep provider and transport details out of response bodies
//!
//! # Design Decisions
//! - Plain-text bodies with fixed messages
//! - Downstream transport failures (502) stay distinct from application
//!   failures reported by the resolver (500)

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Terminal errors of a relay request. None are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Body is not JSON or lacks a string `cep` field.
    #[error("invalid request body")]
    MalformedBody,

    /// `cep` is not exactly 8 digits.
    #[error("invalid zipcode")]
    InvalidZipcode,

    /// The zipcode provider could not resolve a city.
    #[error("can not find zipcode")]
    ZipcodeNotFound,

    /// The weather provider failed.
    #[error("error fetching weather information")]
    WeatherUnavailable,

    /// The resolver could not be reached or did not answer in time.
    #[error("error making request to downstream service")]
    DownstreamUnreachable,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MalformedBody => StatusCode::BAD_REQUEST,
            RelayError::InvalidZipcode => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::ZipcodeNotFound => StatusCode::NOT_FOUND,
            RelayError::WeatherUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::DownstreamUnreachable => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable identifier used in logs, metrics and span attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MalformedBody => "malformed_body",
            RelayError::InvalidZipcode => "invalid_zipcode",
            RelayError::ZipcodeNotFound => "zipcode_not_found",
            RelayError::WeatherUnavailable => "weather_unavailable",
            RelayError::DownstreamUnreachable => "downstream_unreachable",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RelayError::MalformedBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::InvalidZipcode.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(RelayError::ZipcodeNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(RelayError::WeatherUnavailable.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(RelayError::DownstreamUnreachable.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_into_response() {
        let response = RelayError::ZipcodeNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
