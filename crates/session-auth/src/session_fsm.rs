//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 StoredSessionFound / LoginSuccess
//!   ┌───────────┐ ─────────────────────────────────► ┌───────────────┐
//!   │ Anonymous │                                    │ Authenticated │
//!   └───────────┘ ◄───────────────────────────────── └───────────────┘
//!     │      ▲              Teardown                   │        ▲
//!     │      │ LoginFailed                LoginAttempt │        │ LoginSuccess
//!     │      │                                         ▼        │ LoginFailed
//!     │   ┌───────────┐         Teardown        ┌──────────────────┐
//!     └──►│ LoggingIn │ ◄────────────────────── │ Reauthenticating │
//!  Login  └───────────┘                         └──────────────────┘
//!  Attempt
//! ```
//!
//! `LoggingIn` and `Reauthenticating` both carry an in-flight login; they
//! differ in where a failed attempt lands. A teardown while a login is in
//! flight drops any prior credential but leaves the attempt running.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Anonymous)

    Anonymous => {
        StoredSessionFound => Authenticated,
        LoginAttempt => LoggingIn,
        Teardown => Anonymous
    },
    LoggingIn => {
        LoginSuccess => Authenticated,
        LoginFailed => Anonymous,
        Teardown => LoggingIn
    },
    Authenticated => {
        LoginAttempt => Reauthenticating,
        Teardown => Anonymous
    },
    Reauthenticating => {
        LoginSuccess => Authenticated,
        // A failed re-login keeps the session that was already there
        LoginFailed => Authenticated,
        Teardown => LoggingIn
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session phase exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No credential.
    Anonymous,
    /// A login or registration call is in flight.
    Loading,
    /// Credential and user are present.
    Authenticated,
}

impl SessionPhase {
    /// True while a login or registration call is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionPhase::Loading)
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Anonymous => SessionPhase::Anonymous,
            SessionMachineState::LoggingIn | SessionMachineState::Reauthenticating => {
                SessionPhase::Loading
            }
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
        }
    }
}

/// Payload for session state change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChanged {
    /// Current phase.
    pub phase: SessionPhase,
    /// Whether a credential is held after the change.
    pub is_authenticated: bool,
    /// User record if one is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}
