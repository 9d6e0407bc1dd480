//! Client session lifecycle.
//!
//! This crate provides:
//! - An explicit FSM over anonymous, loading, and authenticated sessions
//! - [`SessionController`]: login, registration, logout, user refresh, and
//!   startup hydration from persisted storage
//! - Reaction to gateway-forced teardown (401 anywhere)

mod controller;
mod error;
mod outcome;
mod session_fsm;

pub use controller::{SessionController, SessionSnapshot, SessionStateCallback, User};
pub use error::{SessionError, SessionResult};
pub use outcome::{AuthFailure, AuthOutcome};
pub use session_fsm::session_machine;
pub use session_fsm::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase, SessionStateChanged,
};
