//! Completion handles returned by `show_*`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Polls a displaced-aware receiver. Once the sender is gone without a value
/// the handle never completes.
fn poll_pending<T>(slot: &mut Option<oneshot::Receiver<T>>, cx: &mut Context<'_>) -> Poll<T> {
    let Some(rx) = slot.as_mut() else {
        return Poll::Pending;
    };
    match Pin::new(rx).poll(cx) {
        Poll::Ready(Ok(value)) => {
            *slot = None;
            Poll::Ready(value)
        }
        Poll::Ready(Err(_)) => {
            *slot = None;
            Poll::Pending
        }
        Poll::Pending => Poll::Pending,
    }
}

/// Resolves once the alert it was returned for is closed.
#[derive(Debug)]
#[must_use = "an alert handle does nothing unless awaited"]
pub struct AlertHandle {
    rx: Option<oneshot::Receiver<()>>,
}

impl AlertHandle {
    pub(crate) fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx: Some(rx) }
    }
}

impl Future for AlertHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        poll_pending(&mut self.rx, cx)
    }
}

/// Resolves to `true` when confirmed and `false` when cancelled.
#[derive(Debug)]
#[must_use = "a confirm handle does nothing unless awaited"]
pub struct ConfirmHandle {
    rx: Option<oneshot::Receiver<bool>>,
}

impl ConfirmHandle {
    pub(crate) fn new(rx: oneshot::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }
}

impl Future for ConfirmHandle {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        poll_pending(&mut self.rx, cx)
    }
}
