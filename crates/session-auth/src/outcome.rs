//! Results of login and registration.

use credential_gateway::FieldErrors;
use serde::Serialize;

/// Why a login or registration did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthFailure {
    /// Human-readable message from the server, or a generic fallback.
    pub message: String,
    /// Field-level validation errors. Always `Some` for registration
    /// (empty when the server sent none), always `None` for login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

/// Result of [`crate::SessionController::login`] and
/// [`crate::SessionController::register`]. These operations never return
/// raw errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthOutcome {
    Success,
    Failure(AuthFailure),
}

impl AuthOutcome {
    pub(crate) fn failure(message: impl Into<String>, errors: Option<FieldErrors>) -> Self {
        AuthOutcome::Failure(AuthFailure {
            message: message.into(),
            errors,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }

    pub fn failure_details(&self) -> Option<&AuthFailure> {
        match self {
            AuthOutcome::Success => None,
            AuthOutcome::Failure(failure) => Some(failure),
        }
    }
}
