//! Gateway error types.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name to validation messages, as returned by the server.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Optional error body shape `{ message, errors }` of a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: FieldErrors,
}

impl ErrorPayload {
    /// Parse a response body leniently. Bodies that are not the expected
    /// shape yield `None`.
    pub fn parse(body: &str) -> Option<Self> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}

/// Failure below the HTTP layer: connection, TLS, body read.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Connection refused, DNS failure, timeout and the like.
    pub retryable: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            retryable: err.is_connect() || err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Gateway error type.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    /// HTTP 401. The persisted session has already been evicted.
    #[error("Unauthorized")]
    Unauthorized { payload: Option<ErrorPayload> },

    /// Any other non-2xx status
    #[error("HTTP {status}")]
    Status {
        status: u16,
        payload: Option<ErrorPayload>,
    },

    /// A 2xx body could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Structured error body, if the server sent one.
    pub fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            GatewayError::Unauthorized { payload } | GatewayError::Status { payload, .. } => {
                payload.as_ref()
            }
            _ => None,
        }
    }

    /// Server-provided message, or `fallback`.
    pub fn message_or(&self, fallback: &str) -> String {
        self.payload()
            .and_then(|p| p.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Server-provided field errors, empty when absent.
    pub fn field_errors(&self) -> FieldErrors {
        self.payload().map(|p| p.errors.clone()).unwrap_or_default()
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Unauthorized { .. } => Some(401),
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }

    /// Returns true if retrying the same call could succeed.
    ///
    /// Nothing in this crate retries; callers that want retries decide here.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(e) => e.retryable,
            GatewayError::Status { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// Result type alias using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parse_full_shape() {
        let payload = ErrorPayload::parse(
            r#"{"message":"The given data was invalid.","errors":{"email":["The email has already been taken."]}}"#,
        )
        .unwrap();
        assert_eq!(payload.message.as_deref(), Some("The given data was invalid."));
        assert_eq!(payload.errors["email"], vec!["The email has already been taken."]);
    }

    #[test]
    fn test_payload_parse_lenient() {
        assert_eq!(ErrorPayload::parse(""), None);
        assert_eq!(ErrorPayload::parse("<html>502</html>"), None);
        assert_eq!(
            ErrorPayload::parse(r#"{"message":"nope"}"#).unwrap().errors,
            FieldErrors::new()
        );
    }

    #[test]
    fn test_message_or_falls_back() {
        let err = GatewayError::Status {
            status: 422,
            payload: None,
        };
        assert_eq!(err.message_or("Login failed"), "Login failed");

        let err = GatewayError::Status {
            status: 422,
            payload: Some(ErrorPayload {
                message: Some("Bad password".to_string()),
                errors: FieldErrors::new(),
            }),
        };
        assert_eq!(err.message_or("Login failed"), "Bad password");

        let err = GatewayError::Transport(TransportError::retryable("connection refused"));
        assert_eq!(err.message_or("Login failed"), "Login failed");
    }

    #[test]
    fn test_is_transient() {
        assert!(GatewayError::Transport(TransportError::retryable("timeout")).is_transient());
        assert!(!GatewayError::Transport(TransportError::new("bad tls")).is_transient());
        assert!(GatewayError::Status {
            status: 503,
            payload: None
        }
        .is_transient());
        assert!(!GatewayError::Status {
            status: 422,
            payload: None
        }
        .is_transient());
        assert!(!GatewayError::Unauthorized { payload: None }.is_transient());
    }

    #[test]
    fn test_status() {
        assert_eq!(GatewayError::Unauthorized { payload: None }.status(), Some(401));
        assert_eq!(
            GatewayError::Transport(TransportError::new("x")).status(),
            None
        );
    }
}
