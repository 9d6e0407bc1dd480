//! Scripted transport for tests.

use crate::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

enum Step {
    Respond(HttpResponse),
    Fail(TransportError),
    Gated(oneshot::Receiver<()>, HttpResponse),
}

/// Transport that answers from a FIFO script and records every request.
///
/// An exhausted script answers with a non-retryable transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push_response(&self, status: u16, body: &str) {
        self.steps
            .lock()
            .push_back(Step::Respond(HttpResponse::new(status, body)));
    }

    /// Queue a transport failure.
    pub fn push_transport_error(&self, message: &str) {
        self.steps
            .lock()
            .push_back(Step::Fail(TransportError::retryable(message)));
    }

    /// Queue a response that is held until the returned sender fires.
    pub fn push_gated_response(&self, status: u16, body: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.steps
            .lock()
            .push_back(Step::Gated(rx, HttpResponse::new(status, body)));
        tx
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Paths of the requests seen so far.
    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.path.clone()).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        let step = self.steps.lock().pop_front();

        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Gated(gate, response)) => match gate.await {
                Ok(()) => Ok(response),
                Err(_) => Err(TransportError::new("gate dropped")),
            },
            None => Err(TransportError::new("no scripted response")),
        }
    }
}
