//! Session error types.

use thiserror::Error;

/// Session controller error type.
///
/// These never reach callers of the public operations, which report
/// failures through [`crate::AuthOutcome`] or log them.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
