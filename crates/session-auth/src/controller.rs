//! Session controller with FSM-based state tracking.
//!
//! The controller owns the in-memory session (machine, credential, user) behind
//! one lock, so the credential and user always change together. Persisted
//! copies live in the gateway's [`CredentialStore`]; storage failures are
//! logged and never block the in-memory transition.

use crate::outcome::AuthOutcome;
use crate::session_fsm::{
    SessionMachine, SessionMachineInput, SessionPhase, SessionStateChanged,
};
use crate::{SessionError, SessionResult};
use client_storage::CredentialStore;
use credential_gateway::{
    AuthPayload, CredentialGateway, GatewayResult, LoginRequest, RegisterRequest, SessionEvent,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Opaque user record as returned by the server.
pub type User = serde_json::Value;

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChanged) + Send + Sync>;

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const ATTEMPT_IN_PROGRESS: &str = "A sign-in request is already in progress";

/// Point-in-time view of the session for the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub is_authenticated: bool,
    pub loading: bool,
    pub user: Option<User>,
}

struct SessionData {
    machine: SessionMachine,
    token: Option<String>,
    user: Option<User>,
    initialized: bool,
}

impl SessionData {
    fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.machine.state())
    }

    fn consume(&mut self, input: SessionMachineInput) -> SessionResult<()> {
        self.machine.consume(&input).map(|_| ()).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                self.machine.state()
            ))
        })
    }

    fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }
}

/// Owns the client's authentication state.
///
/// One instance per process (or per test). Operations never return raw
/// errors: login and registration report an [`AuthOutcome`], logout and user
/// refresh log remote failures and tear the session down locally.
///
/// Concurrent logins are not queued: a login or registration started while
/// another is in flight fails immediately. In-flight calls cannot be
/// cancelled by the controller; dropping the returned future abandons the
/// call and clears the loading phase.
pub struct SessionController {
    gateway: CredentialGateway,
    state: Mutex<SessionData>,
    state_callback: Mutex<Option<SessionStateCallback>>,
}

impl SessionController {
    /// Create a new session controller. Call [`Self::init_auth`] before use.
    pub fn new(gateway: CredentialGateway) -> Self {
        Self {
            gateway,
            state: Mutex::new(SessionData {
                machine: SessionMachine::new(),
                token: None,
                user: None,
                initialized: false,
            }),
            state_callback: Mutex::new(None),
        }
    }

    /// Set a callback to be notified of phase changes.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    pub fn gateway(&self) -> &CredentialGateway {
        &self.gateway
    }

    fn store(&self) -> &CredentialStore {
        self.gateway.store()
    }

    // ==========================================
    // State accessors
    // ==========================================

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase()
    }

    /// True when a credential is held.
    pub fn is_authenticated(&self) -> bool {
        self.state.lock().token.is_some()
    }

    /// True while a login or registration call is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase().is_loading()
    }

    pub fn user(&self) -> Option<User> {
        self.state.lock().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let data = self.state.lock();
        let phase = data.phase();
        SessionSnapshot {
            phase,
            is_authenticated: data.token.is_some(),
            loading: phase.is_loading(),
            user: data.user.clone(),
        }
    }

    /// Run `f` under the state lock and notify the callback afterwards if the
    /// phase changed.
    fn update<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let (result, change) = {
            let mut data = self.state.lock();
            let before = data.phase();
            let result = f(&mut *data);
            let after = data.phase();

            let change = (before != after).then(|| {
                debug!(old_phase = ?before, new_phase = ?after, "Session phase transition");
                SessionStateChanged {
                    phase: after,
                    is_authenticated: data.token.is_some(),
                    user: data.user.clone(),
                }
            });
            (result, change)
        };

        if let Some(change) = change {
            if let Some(callback) = self.state_callback.lock().as_ref() {
                callback(change);
            }
        }

        result
    }

    // ==========================================
    // Operations
    // ==========================================

    /// Hydrate the session from persisted storage.
    ///
    /// Trusts what is stored: when both credential and user are present the
    /// session becomes authenticated without a network call. Only the first
    /// call does anything; later calls return the current phase.
    pub fn init_auth(&self) -> SessionPhase {
        let store = self.store().clone();

        self.update(|data| {
            if data.initialized {
                return data.phase();
            }
            data.initialized = true;

            let token = store.get_token().unwrap_or_else(|e| {
                warn!(error = %e, "Could not read persisted credential");
                None
            });
            let user = store.get_user().unwrap_or_else(|e| {
                warn!(error = %e, "Could not read persisted user");
                None
            });

            match (token, user) {
                (Some(token), Some(user)) => match data.consume(SessionMachineInput::StoredSessionFound) {
                    Ok(()) => {
                        data.token = Some(token);
                        data.user = Some(user);
                        info!("Restored persisted session");
                    }
                    Err(e) => debug!(error = %e, "Session already active, skipping restore"),
                },
                _ => info!("No persisted session found"),
            }

            data.phase()
        })
    }

    /// Log in with email and password.
    pub async fn login(&self, credentials: &LoginRequest) -> AuthOutcome {
        self.authenticate("login", self.gateway.login(credentials), LOGIN_FAILED, false)
            .await
    }

    /// Create an account and log into it.
    ///
    /// Failures always carry a field error map, empty when the server sent none.
    pub async fn register(&self, data: &RegisterRequest) -> AuthOutcome {
        self.authenticate(
            "register",
            self.gateway.register(data),
            REGISTRATION_FAILED,
            true,
        )
        .await
    }

    async fn authenticate<F>(
        &self,
        operation: &'static str,
        call: F,
        fallback: &str,
        with_field_errors: bool,
    ) -> AuthOutcome
    where
        F: Future<Output = GatewayResult<AuthPayload>>,
    {
        let attempt = match self.begin_attempt() {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(operation, error = %e, "Rejected overlapping sign-in");
                let errors = with_field_errors.then(Default::default);
                return AuthOutcome::failure(ATTEMPT_IN_PROGRESS, errors);
            }
        };

        match call.await {
            Ok(payload) => {
                attempt.succeed(payload);
                AuthOutcome::Success
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.apply_teardown();
                }
                warn!(operation, error = %e, "Sign-in failed");
                let errors = with_field_errors.then(|| e.field_errors());
                AuthOutcome::failure(e.message_or(fallback), errors)
            }
        }
    }

    fn begin_attempt(&self) -> SessionResult<AttemptGuard<'_>> {
        self.update(|data| data.consume(SessionMachineInput::LoginAttempt))?;
        Ok(AttemptGuard {
            controller: self,
            finished: false,
        })
    }

    /// Log out.
    ///
    /// The server call is best-effort. The local credential and user are
    /// cleared from memory and storage afterwards no matter how it went, and
    /// also if this future is dropped mid-call.
    pub async fn logout(&self) {
        let _teardown = LogoutGuard { controller: self };

        if let Err(e) = self.gateway.logout().await {
            error!(error = %e, "Logout error");
        }
    }

    /// Refresh the user record from the server.
    ///
    /// On success the in-memory and persisted user are replaced (the
    /// credential is untouched). Any failure is treated as an invalid
    /// session and triggers a full [`Self::logout`]. A response that arrives
    /// after the session changed is discarded.
    pub async fn fetch_user(&self) -> Option<User> {
        let issued_with = self.token();
        let result = self.gateway.current_user().await;

        match result {
            Ok(user) => {
                let store = self.store().clone();
                let applied = self.update(|data| {
                    if data.token.is_none() || data.token != issued_with {
                        return false;
                    }
                    data.user = Some(user.clone());
                    if let Err(e) = store.set_user(&user) {
                        warn!(error = %e, "Failed to persist refreshed user");
                    }
                    true
                });

                if applied {
                    debug!("User record refreshed");
                    Some(user)
                } else {
                    debug!("Session changed while fetching user, discarding result");
                    None
                }
            }
            Err(e) => {
                warn!(error = %e, "Fetch user error");
                if self.token() != issued_with {
                    debug!("Session changed while fetching user, keeping it");
                    return None;
                }
                self.logout().await;
                None
            }
        }
    }

    // ==========================================
    // Teardown
    // ==========================================

    /// React to a gateway event.
    pub fn handle_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Terminated { reason, path, .. } => {
                info!(reason = ?reason, path = %path, "Applying gateway-forced teardown");
                self.apply_teardown();
            }
        }
    }

    /// Clear the in-memory session after the gateway evicted storage.
    ///
    /// Events are observed some time after the 401 that caused them. If the
    /// store holds the credential this controller holds, a newer session was
    /// persisted in between and is kept.
    fn apply_teardown(&self) {
        let store = self.store().clone();
        self.update(|data| {
            match store.get_token() {
                Ok(Some(persisted)) if data.token.as_deref() == Some(persisted.as_str()) => {
                    debug!("Session was replaced after termination, keeping it");
                    return;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Could not read persisted credential during teardown"),
            }
            if let Err(e) = data.consume(SessionMachineInput::Teardown) {
                warn!(error = %e, "Unexpected teardown transition failure");
            }
            data.clear();
        });
    }

    /// Clear memory and storage together.
    fn teardown_everywhere(&self) {
        let store = self.store().clone();
        self.update(|data| {
            if let Err(e) = data.consume(SessionMachineInput::Teardown) {
                warn!(error = %e, "Unexpected teardown transition failure");
            }
            data.clear();
            if let Err(e) = store.clear_session() {
                warn!(error = %e, "Failed to remove persisted session");
            }
        });
        info!("Logged out");
    }

    /// Apply gateway termination events for as long as this controller lives.
    ///
    /// The task holds only a weak reference and exits once the controller is
    /// dropped or the gateway's event channel closes.
    pub fn spawn_termination_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.gateway.subscribe();
        let controller: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let event = events.recv().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                match event {
                    Ok(event) => controller.handle_event(&event),
                    Err(RecvError::Lagged(missed)) => {
                        // Every event is a termination, so missing some still means teardown
                        warn!(missed, "Session event listener lagged");
                        controller.apply_teardown();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Session event listener stopped");
        })
    }
}

/// Tracks one in-flight login or registration. Dropping it without
/// [`AttemptGuard::succeed`] records a failed attempt, which is what clears
/// the loading phase on every error path and on cancellation.
struct AttemptGuard<'a> {
    controller: &'a SessionController,
    finished: bool,
}

impl AttemptGuard<'_> {
    fn succeed(mut self, payload: AuthPayload) {
        self.finished = true;
        let store = self.controller.store().clone();

        self.controller.update(|data| {
            if let Err(e) = data.consume(SessionMachineInput::LoginSuccess) {
                warn!(error = %e, "Discarding sign-in result");
                return;
            }
            if let Err(e) = store.set_session(&payload.token, &payload.user) {
                warn!(error = %e, "Failed to persist session");
            }
            data.token = Some(payload.token);
            data.user = Some(payload.user);
            info!("Signed in");
        });
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.controller.update(|data| {
            if let Err(e) = data.consume(SessionMachineInput::LoginFailed) {
                warn!(error = %e, "Unexpected state after failed sign-in");
            }
        });
    }
}

struct LogoutGuard<'a> {
    controller: &'a SessionController,
}

impl Drop for LogoutGuard<'_> {
    fn drop(&mut self) {
        self.controller.teardown_everywhere();
    }
}
