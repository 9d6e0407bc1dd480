//! Single chokepoint for every outbound API call.
//!
//! This crate provides:
//! - A [`Transport`] seam with a reqwest implementation
//! - Bearer credential injection read from storage on every request
//! - Global 401 handling: persisted session eviction plus a
//!   [`SessionEvent::Terminated`] broadcast
//! - Typed calls for the fixed set of API endpoints

mod api;
mod error;
mod events;
mod gateway;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use api::{AuthPayload, LoginRequest, RegisterRequest};
pub use error::{ErrorPayload, FieldErrors, GatewayError, GatewayResult, TransportError};
pub use events::{SessionEvent, TerminationReason};
pub use gateway::CredentialGateway;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
