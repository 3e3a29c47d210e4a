//! Normalized error type for the CaaS API client.
//!
//! # Design
//! Every failure, whatever its cause, is surfaced as an `ApiError` exposing
//! the same three accessors: `message()` (never empty), `status()` (present
//! iff a response was received) and `payload()` (the raw response body when
//! there is one). The variants keep the cause distinguishable for callers
//! that care; UI-facing code only reads the message.

use thiserror::Error;

/// Fallback message when a failure carries no usable text.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

const NO_RESPONSE_MESSAGE: &str = "Network error: No response from server";

/// Errors returned by `ApiClient` operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Rejected locally before any network call, e.g. a missing identifier.
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        payload: Option<serde_json::Value>,
    },

    /// The request was sent but no response arrived (connection failure or
    /// timeout).
    #[error("{0}")]
    Network(String),

    /// The request could not be constructed or sent.
    #[error("{0}")]
    Client(String),

    /// A 2xx response arrived but its body did not decode into the expected
    /// type.
    #[error("{message}")]
    InvalidResponse { status: u16, message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(non_empty(message.into()))
    }

    pub fn network(cause: impl std::fmt::Display) -> Self {
        let cause = cause.to_string();
        if cause.is_empty() {
            ApiError::Network(NO_RESPONSE_MESSAGE.to_string())
        } else {
            ApiError::Network(format!("{NO_RESPONSE_MESSAGE} ({cause})"))
        }
    }

    pub fn client(message: impl Into<String>) -> Self {
        ApiError::Client(non_empty(message.into()))
    }

    /// Build a server error from a non-2xx response.
    ///
    /// The message is taken from the payload's `message` field, then its
    /// `detail` field, falling back to a generic status line. A body that is
    /// not JSON is kept as a string payload.
    pub fn from_response(status: u16, body: &str) -> Self {
        let payload = if body.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<serde_json::Value>(body)
                    .unwrap_or_else(|_| serde_json::Value::String(body.to_string())),
            )
        };
        let message = payload
            .as_ref()
            .and_then(|p| {
                ["message", "detail"]
                    .iter()
                    .find_map(|key| p.get(key).and_then(|v| v.as_str()))
            })
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        ApiError::Server {
            status,
            message,
            payload,
        }
    }

    pub fn invalid_response(status: u16, cause: impl std::fmt::Display) -> Self {
        ApiError::InvalidResponse {
            status,
            message: format!("Invalid response body: {cause}"),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(message)
            | ApiError::Network(message)
            | ApiError::Client(message) => message,
            ApiError::Server { message, .. } | ApiError::InvalidResponse { message, .. } => message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } | ApiError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Server { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

fn non_empty(message: String) -> String {
    if message.is_empty() {
        UNEXPECTED_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

/// Extract the user-facing message from any failure.
///
/// Normalized errors contribute their own message; anything else yields
/// [`UNEXPECTED_ERROR_MESSAGE`].
pub fn failure_message(err: &anyhow::Error) -> String {
    err.downcast_ref::<ApiError>()
        .map(|e| e.message().to_string())
        .unwrap_or_else(|| UNEXPECTED_ERROR_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_prefers_payload_message() {
        let err = ApiError::from_response(404, r#"{"message":"Location not found"}"#);
        assert_eq!(err.message(), "Location not found");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.payload().unwrap()["message"], "Location not found");
    }

    #[test]
    fn server_error_falls_back_to_detail() {
        let err = ApiError::from_response(422, r#"{"detail":"field required"}"#);
        assert_eq!(err.message(), "field required");
    }

    #[test]
    fn server_error_generic_message_for_empty_body() {
        let err = ApiError::from_response(503, "");
        assert_eq!(err.message(), "Request failed with status code 503");
        assert!(err.payload().is_none());
    }

    #[test]
    fn server_error_keeps_non_json_body_as_string() {
        let err = ApiError::from_response(502, "bad gateway");
        assert_eq!(err.payload(), Some(&serde_json::Value::String("bad gateway".into())));
        assert_eq!(err.message(), "Request failed with status code 502");
    }

    #[test]
    fn network_error_has_no_status() {
        let err = ApiError::network("connection refused");
        assert!(err.message().starts_with("Network error: No response from server"));
        assert!(err.status().is_none());
        assert!(err.payload().is_none());
    }

    #[test]
    fn empty_messages_are_replaced() {
        assert_eq!(ApiError::validation("").message(), UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(ApiError::client("").message(), UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(ApiError::network("").message(), NO_RESPONSE_MESSAGE);
    }

    #[test]
    fn display_matches_message() {
        let err = ApiError::validation("Location ID is required");
        assert_eq!(err.to_string(), "Location ID is required");
    }

    #[test]
    fn failure_message_downcasts_api_errors() {
        let err = anyhow::Error::new(ApiError::validation("Execution ID is required"));
        assert_eq!(failure_message(&err), "Execution ID is required");

        let other = anyhow::anyhow!("boom");
        assert_eq!(failure_message(&other), UNEXPECTED_ERROR_MESSAGE);
    }
}
