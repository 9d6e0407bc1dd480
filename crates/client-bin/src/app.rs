//! Wiring of store, gateway, and controller for one CLI invocation.

use std::sync::Arc;

use client_config_and_utils::{Config, Paths};
use client_storage::{CredentialStore, FileStore};
use credential_gateway::{
    CredentialGateway, LoginRequest, RegisterRequest, ReqwestTransport, SessionEvent,
};
use serde_json::json;
use session_auth::{AuthOutcome, SessionController};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

pub struct App {
    controller: Arc<SessionController>,
    events: broadcast::Receiver<SessionEvent>,
    listener: JoinHandle<()>,
}

impl App {
    /// Open the session file, build the gateway, and hydrate the session.
    pub fn build(config: &Config, paths: &Paths) -> AppResult<Self> {
        paths.ensure_dirs()?;

        let store_path = paths.session_store_file();
        let store = CredentialStore::new(Arc::new(FileStore::open(&store_path)?));
        let base_url = config.api_base_url()?;
        info!(api_base_url = %base_url, store = %store_path.display(), "Starting webclient");

        let transport = Arc::new(ReqwestTransport::new(&base_url));
        let gateway =
            CredentialGateway::new(transport, store).with_login_route(config.login_route.clone());
        let events = gateway.subscribe();

        let controller = Arc::new(SessionController::new(gateway));
        let phase = controller.init_auth();
        debug!(phase = ?phase, "Session initialized");
        let listener = controller.spawn_termination_listener();

        Ok(Self {
            controller,
            events,
            listener,
        })
    }

    pub async fn login(mut self, email: String, password: String) -> AppResult<()> {
        let outcome = self
            .controller
            .login(&LoginRequest { email, password })
            .await;
        self.finish_auth(outcome)
    }

    pub async fn register(
        mut self,
        name: String,
        email: String,
        password: String,
        password_confirmation: String,
    ) -> AppResult<()> {
        let outcome = self
            .controller
            .register(&RegisterRequest {
                name,
                email,
                password,
                password_confirmation,
            })
            .await;
        self.finish_auth(outcome)
    }

    fn finish_auth(&mut self, outcome: AuthOutcome) -> AppResult<()> {
        self.report_terminations();
        match outcome {
            AuthOutcome::Success => {
                print_json(&json!({
                    "status": "success",
                    "user": self.controller.user(),
                }))?;
                Ok(())
            }
            AuthOutcome::Failure(failure) => {
                print_json(&failure)?;
                Err(failure.message.into())
            }
        }
    }

    pub async fn logout(mut self) -> AppResult<()> {
        self.controller.logout().await;
        self.report_terminations();
        print_json(&self.controller.snapshot())
    }

    pub async fn whoami(mut self) -> AppResult<()> {
        if !self.controller.is_authenticated() {
            return Err("Not logged in".into());
        }
        let user = self.controller.fetch_user().await;
        self.report_terminations();
        match user {
            Some(user) => print_json(&user),
            None => Err("Session is no longer valid; logged out".into()),
        }
    }

    pub fn status(self) -> AppResult<()> {
        print_json(&self.controller.snapshot())
    }

    /// Print any session terminations the gateway announced.
    fn report_terminations(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match &event {
                SessionEvent::Terminated { redirect_to, .. } => {
                    eprintln!("Session ended by the server; sign in again ({redirect_to})");
                }
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
