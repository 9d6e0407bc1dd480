//! Request decoration and response interception.

use crate::{
    ErrorPayload, GatewayError, GatewayResult, HttpMethod, HttpRequest, HttpResponse,
    SessionEvent, TerminationReason, Transport,
};
use client_storage::CredentialStore;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Login entry point announced when no other route is configured.
const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Capacity of the session event channel. Slow subscribers lag rather than
/// block the gateway.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Wraps every outbound call with the persisted bearer credential and tears
/// the persisted session down on any 401.
///
/// Cloning is cheap; clones share the transport, store, and event channel.
#[derive(Clone)]
pub struct CredentialGateway {
    transport: Arc<dyn Transport>,
    store: CredentialStore,
    events: broadcast::Sender<SessionEvent>,
    login_route: String,
}

impl CredentialGateway {
    /// Create a new gateway.
    pub fn new(transport: Arc<dyn Transport>, store: CredentialStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            store,
            events,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }

    /// Route carried by termination events.
    pub fn with_login_route(mut self, login_route: impl Into<String>) -> Self {
        self.login_route = login_route.into();
        self
    }

    /// The credential store this gateway reads tokens from.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Issue a request and decode the 2xx body as JSON.
    ///
    /// An empty 2xx body decodes as `Value::Null`.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> GatewayResult<Value> {
        let mut request = HttpRequest::new(method, path).with_query(query);
        request.body = body;
        let response = self.dispatch(request).await?;

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Issue a request and decode the 2xx body into `T`.
    pub(crate) async fn request_as<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> GatewayResult<T> {
        let value = self.request(method, path, Vec::new(), body).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn dispatch(&self, mut request: HttpRequest) -> GatewayResult<HttpResponse> {
        self.decorate(&mut request);

        let method = request.method;
        let path = request.path.clone();

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %method, path = %path, error = %e, "API request failed");
                return Err(GatewayError::Transport(e));
            }
        };

        if response.is_success() {
            debug!(method = %method, path = %path, status = response.status, "API request succeeded");
            return Ok(response);
        }

        let payload = ErrorPayload::parse(&response.body);

        if response.status == 401 {
            self.terminate_session(&path);
            return Err(GatewayError::Unauthorized { payload });
        }

        debug!(method = %method, path = %path, status = response.status, "API request rejected");
        Err(GatewayError::Status {
            status: response.status,
            payload,
        })
    }

    /// Attach the current bearer token. Read on every request so a credential
    /// change takes effect on the next call.
    fn decorate(&self, request: &mut HttpRequest) {
        match self.store.get_token() {
            Ok(Some(token)) => {
                request
                    .headers
                    .push(("Authorization".to_string(), format!("Bearer {}", token)));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Could not read credential, sending request without it");
            }
        }
    }

    /// Evict the persisted session and announce the termination.
    fn terminate_session(&self, path: &str) {
        if let Err(e) = self.store.clear_session() {
            error!(error = %e, "Failed to evict persisted session after 401");
        }

        info!(path = %path, redirect_to = %self.login_route, "Session terminated by 401 response");

        let event = SessionEvent::Terminated {
            reason: TerminationReason::Unauthorized,
            redirect_to: self.login_route.clone(),
            path: path.to_string(),
        };
        if self.events.send(event).is_err() {
            debug!("No session event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use client_storage::MemoryStore;
    use serde_json::json;

    fn create_gateway() -> (Arc<ScriptedTransport>, CredentialGateway) {
        let transport = Arc::new(ScriptedTransport::new());
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        let gateway = CredentialGateway::new(transport.clone(), store);
        (transport, gateway)
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let (transport, gateway) = create_gateway();
        transport.push_response(200, r#"{"ok":true}"#);

        let value = gateway
            .request(HttpMethod::Get, "/dashboard", Vec::new(), None)
            .await
            .unwrap();

        assert_eq!(value, json!({ "ok": true }));
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_token_read_per_request() {
        let (transport, gateway) = create_gateway();
        transport.push_response(200, "{}");
        transport.push_response(200, "{}");

        gateway.store().set_session("first", &json!({ "id": 1 })).unwrap();
        gateway
            .request(HttpMethod::Get, "/user", Vec::new(), None)
            .await
            .unwrap();

        gateway.store().set_session("second", &json!({ "id": 1 })).unwrap();
        gateway
            .request(HttpMethod::Get, "/user", Vec::new(), None)
            .await
            .unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].header("Authorization"), Some("Bearer first"));
        assert_eq!(sent[1].header("Authorization"), Some("Bearer second"));
    }

    #[tokio::test]
    async fn test_401_evicts_session_and_emits_event() {
        let (transport, gateway) = create_gateway();
        let mut events = gateway.subscribe();
        gateway.store().set_session("stale", &json!({ "id": 1 })).unwrap();
        transport.push_response(401, r#"{"message":"Unauthenticated."}"#);

        let err = gateway
            .request(HttpMethod::Delete, "/posts/9", Vec::new(), None)
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.message_or("x"), "Unauthenticated.");
        assert!(!gateway.store().has_session().unwrap());
        assert_eq!(gateway.store().get_token().unwrap(), None);

        let event = events.try_recv().unwrap();
        assert_eq!(
            event,
            SessionEvent::Terminated {
                reason: TerminationReason::Unauthorized,
                redirect_to: "/login".to_string(),
                path: "/posts/9".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_401_without_subscribers_still_evicts() {
        let (transport, gateway) = create_gateway();
        gateway
            .store()
            .set_session("stale", &json!({ "id": 1 }))
            .unwrap();
        transport.push_response(401, "");

        let err = gateway
            .request(HttpMethod::Get, "/posts", Vec::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Unauthorized { payload: None }));
        assert!(!gateway.store().has_session().unwrap());
    }

    #[tokio::test]
    async fn test_other_statuses_propagate_without_teardown() {
        let (transport, gateway) = create_gateway();
        gateway.store().set_session("tok", &json!({ "id": 1 })).unwrap();
        let mut events = gateway.subscribe();
        transport.push_response(
            422,
            r#"{"message":"Invalid","errors":{"title":["required"]}}"#,
        );

        let err = gateway
            .request(HttpMethod::Post, "/posts", Vec::new(), Some(json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert_eq!(err.field_errors()["title"], vec!["required"]);
        assert!(gateway.store().has_session().unwrap());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let (transport, gateway) = create_gateway();
        transport.push_transport_error("connection refused");

        let err = gateway
            .request(HttpMethod::Get, "/user", Vec::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let (transport, gateway) = create_gateway();
        transport.push_response(204, "");

        let value = gateway
            .request(HttpMethod::Delete, "/posts/1", Vec::new(), None)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_custom_login_route_in_event() {
        let (transport, gateway) = create_gateway();
        let gateway = gateway.with_login_route("/auth/sign-in");
        let mut events = gateway.subscribe();
        transport.push_response(401, "");

        let _ = gateway
            .request(HttpMethod::Get, "/user", Vec::new(), None)
            .await;

        match events.try_recv().unwrap() {
            SessionEvent::Terminated { redirect_to, .. } => {
                assert_eq!(redirect_to, "/auth/sign-in")
            }
        }
    }
}
