//! Session lifecycle events broadcast by the gateway.

use serde::{Deserialize, Serialize};

/// Why a session was torn down outside the controller's own operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The server answered 401 to some request.
    Unauthorized,
}

/// Event observed by the session controller and the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The persisted credential has been evicted. The UI should navigate to
    /// `redirect_to`.
    Terminated {
        reason: TerminationReason,
        redirect_to: String,
        /// Path of the request that triggered the teardown.
        path: String,
    },
}
