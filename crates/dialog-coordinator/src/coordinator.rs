//! Alert and confirm coordination.

use crate::handle::{AlertHandle, ConfirmHandle};
use crate::state::{AlertOptions, AlertState, ConfirmOptions, ConfirmState, DialogType};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What happens to a pending handle when a new dialog of the same kind
/// replaces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplacedPolicy {
    /// The displaced handle never settles.
    #[default]
    Abandon,
    /// The displaced alert resolves and the displaced confirm resolves `false`.
    Dismiss,
}

struct AlertSlot {
    pending: Option<oneshot::Sender<()>>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl AlertSlot {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    policy: DisplacedPolicy,
    alert: Mutex<AlertSlot>,
    confirm: Mutex<Option<oneshot::Sender<bool>>>,
    alert_tx: watch::Sender<AlertState>,
    confirm_tx: watch::Sender<ConfirmState>,
}

/// Owns the alert and confirm dialogs.
///
/// Cloning is cheap; clones drive the same dialogs. Create one per process
/// (or per test) and hand clones to whoever needs to show dialogs.
#[derive(Clone)]
pub struct DialogCoordinator {
    shared: Arc<Shared>,
}

impl Default for DialogCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogCoordinator {
    pub fn new() -> Self {
        Self::with_policy(DisplacedPolicy::default())
    }

    pub fn with_policy(policy: DisplacedPolicy) -> Self {
        let (alert_tx, _) = watch::channel(AlertState::default());
        let (confirm_tx, _) = watch::channel(ConfirmState::default());
        Self {
            shared: Arc::new(Shared {
                policy,
                alert: Mutex::new(AlertSlot {
                    pending: None,
                    generation: 0,
                    timer: None,
                }),
                confirm: Mutex::new(None),
                alert_tx,
                confirm_tx,
            }),
        }
    }

    pub fn policy(&self) -> DisplacedPolicy {
        self.shared.policy
    }

    // ==========================================
    // Alert
    // ==========================================

    /// Show an alert, replacing any visible one.
    ///
    /// The returned handle resolves when the alert is closed. With an
    /// auto-dismiss delay the alert closes itself unless closed or replaced
    /// first. The timer needs a tokio runtime; without one the delay is
    /// ignored.
    pub fn show_alert(
        &self,
        message: impl Into<String>,
        dialog_type: DialogType,
        options: AlertOptions,
    ) -> AlertHandle {
        let (tx, rx) = oneshot::channel();
        let state = AlertState::shown(message.into(), dialog_type, &options);

        let mut slot = self.shared.alert.lock();
        slot.cancel_timer();
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        if let Some(displaced) = slot.pending.replace(tx) {
            match self.shared.policy {
                DisplacedPolicy::Abandon => debug!(generation, "Abandoning displaced alert"),
                DisplacedPolicy::Dismiss => {
                    let _ = displaced.send(());
                }
            }
        }

        if let Some(after) = options.effective_auto_dismiss() {
            slot.timer = self.spawn_auto_dismiss(generation, after);
        }

        debug!(generation, dialog_type = ?state.dialog_type, "Showing alert");
        self.shared.alert_tx.send_replace(state);

        AlertHandle::new(rx)
    }

    /// Close the visible alert and resolve its handle. No-op when nothing is
    /// pending.
    pub fn close_alert(&self) {
        let mut slot = self.shared.alert.lock();
        Self::close_alert_locked(&self.shared, &mut slot);
    }

    fn close_alert_locked(shared: &Shared, slot: &mut AlertSlot) {
        slot.cancel_timer();
        shared
            .alert_tx
            .send_if_modified(|state| std::mem::replace(&mut state.is_visible, false));

        if let Some(pending) = slot.pending.take() {
            // The caller may have dropped its handle
            let _ = pending.send(());
            debug!(generation = slot.generation, "Alert closed");
        }
    }

    fn spawn_auto_dismiss(&self, generation: u64, after: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime, alert auto-dismiss disabled");
            return None;
        };
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);

        Some(runtime.spawn(async move {
            tokio::time::sleep(after).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut slot = shared.alert.lock();
            if slot.generation != generation {
                return;
            }
            // Dropping our own JoinHandle does not cancel us
            slot.timer = None;
            debug!(generation, "Auto-dismissing alert");
            Self::close_alert_locked(&shared, &mut slot);
        }))
    }

    pub fn alert_state(&self) -> AlertState {
        self.shared.alert_tx.borrow().clone()
    }

    /// Subscribe to alert changes.
    pub fn watch_alert(&self) -> watch::Receiver<AlertState> {
        self.shared.alert_tx.subscribe()
    }

    // ==========================================
    // Confirm
    // ==========================================

    /// Show a confirm dialog, replacing any visible one.
    pub fn show_confirm(&self, message: impl Into<String>, options: ConfirmOptions) -> ConfirmHandle {
        let (tx, rx) = oneshot::channel();
        let state = ConfirmState::shown(message.into(), options);

        let mut pending = self.shared.confirm.lock();
        if let Some(displaced) = pending.replace(tx) {
            match self.shared.policy {
                DisplacedPolicy::Abandon => debug!("Abandoning displaced confirm"),
                DisplacedPolicy::Dismiss => {
                    let _ = displaced.send(false);
                }
            }
        }

        debug!(dialog_type = ?state.dialog_type, "Showing confirm");
        self.shared.confirm_tx.send_replace(state);

        ConfirmHandle::new(rx)
    }

    /// Accept the visible confirm dialog.
    pub fn confirm_dialog(&self) {
        self.resolve_confirm(true);
    }

    /// Reject the visible confirm dialog.
    pub fn cancel_dialog(&self) {
        self.resolve_confirm(false);
    }

    fn resolve_confirm(&self, accepted: bool) {
        let mut pending = self.shared.confirm.lock();
        self.shared
            .confirm_tx
            .send_if_modified(|state| std::mem::replace(&mut state.is_visible, false));

        if let Some(tx) = pending.take() {
            let _ = tx.send(accepted);
            debug!(accepted, "Confirm resolved");
        }
    }

    pub fn confirm_state(&self) -> ConfirmState {
        self.shared.confirm_tx.borrow().clone()
    }

    /// Subscribe to confirm changes.
    pub fn watch_confirm(&self) -> watch::Receiver<ConfirmState> {
        self.shared.confirm_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const OBSERVE: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_alert_settles_only_after_close() {
        let dialogs = DialogCoordinator::new();
        let mut handle = dialogs.show_alert("hi", DialogType::Info, AlertOptions::default());

        assert!(dialogs.alert_state().is_visible);
        assert_eq!(dialogs.alert_state().message, "hi");
        assert!(timeout(OBSERVE, &mut handle).await.is_err());

        dialogs.close_alert();
        timeout(OBSERVE, handle).await.unwrap();
        assert!(!dialogs.alert_state().is_visible);
    }

    #[tokio::test]
    async fn test_close_alert_twice_is_noop() {
        let dialogs = DialogCoordinator::new();
        let handle = dialogs.show_alert("hi", DialogType::Info, AlertOptions::default());

        dialogs.close_alert();
        dialogs.close_alert();
        timeout(OBSERVE, handle).await.unwrap();

        // Closing with nothing shown at all
        DialogCoordinator::new().close_alert();
    }

    #[tokio::test]
    async fn test_confirm_and_cancel() {
        let dialogs = DialogCoordinator::new();

        let handle = dialogs.show_confirm("Delete?", ConfirmOptions::default());
        assert!(dialogs.confirm_state().is_visible);
        dialogs.confirm_dialog();
        assert!(timeout(OBSERVE, handle).await.unwrap());

        let handle = dialogs.show_confirm("Delete?", ConfirmOptions::default());
        dialogs.cancel_dialog();
        assert!(!timeout(OBSERVE, handle).await.unwrap());
        assert!(!dialogs.confirm_state().is_visible);

        // Nothing pending
        dialogs.cancel_dialog();
        dialogs.confirm_dialog();
    }

    #[tokio::test]
    async fn test_overwrite_abandons_previous_handle() {
        let dialogs = DialogCoordinator::new();
        let mut first = dialogs.show_alert("a", DialogType::Info, AlertOptions::default());
        let second = dialogs.show_alert("b", DialogType::Error, AlertOptions::default());

        let state = dialogs.alert_state();
        assert!(state.is_visible);
        assert_eq!(state.message, "b");
        assert_eq!(state.dialog_type, DialogType::Error);

        dialogs.close_alert();
        timeout(OBSERVE, second).await.unwrap();
        assert!(timeout(OBSERVE, &mut first).await.is_err());
    }

    #[tokio::test]
    async fn test_overwrite_abandons_previous_confirm() {
        let dialogs = DialogCoordinator::new();
        let mut first = dialogs.show_confirm("a", ConfirmOptions::default());
        let second = dialogs.show_confirm("b", ConfirmOptions::default());

        assert_eq!(dialogs.confirm_state().message, "b");
        dialogs.confirm_dialog();
        assert!(timeout(OBSERVE, second).await.unwrap());
        assert!(timeout(OBSERVE, &mut first).await.is_err());
    }

    #[tokio::test]
    async fn test_dismiss_policy_settles_displaced_handles() {
        let dialogs = DialogCoordinator::with_policy(DisplacedPolicy::Dismiss);

        let first = dialogs.show_alert("a", DialogType::Info, AlertOptions::default());
        let _second = dialogs.show_alert("b", DialogType::Info, AlertOptions::default());
        timeout(OBSERVE, first).await.unwrap();

        let first = dialogs.show_confirm("a", ConfirmOptions::default());
        let _second = dialogs.show_confirm("b", ConfirmOptions::default());
        assert!(!timeout(OBSERVE, first).await.unwrap());
        assert!(dialogs.confirm_state().is_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_closes_alert() {
        let dialogs = DialogCoordinator::new();
        let handle = dialogs.show_alert(
            "Saved",
            DialogType::Success,
            AlertOptions::default().with_auto_dismiss(Duration::from_secs(3)),
        );
        assert_eq!(dialogs.alert_state().auto_dismiss_ms, 3000);

        timeout(Duration::from_secs(4), handle).await.unwrap();
        assert!(!dialogs.alert_state().is_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_close_newer_alert() {
        let dialogs = DialogCoordinator::new();
        let _first = dialogs.show_alert(
            "a",
            DialogType::Info,
            AlertOptions::default().with_auto_dismiss(Duration::from_secs(1)),
        );
        let mut second = dialogs.show_alert("b", DialogType::Info, AlertOptions::default());

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(dialogs.alert_state().is_visible);
        assert_eq!(dialogs.alert_state().message, "b");
        assert!(timeout(OBSERVE, &mut second).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_close_cancels_timer() {
        let dialogs = DialogCoordinator::new();
        let first = dialogs.show_alert(
            "a",
            DialogType::Info,
            AlertOptions::default().with_auto_dismiss(Duration::from_secs(1)),
        );
        dialogs.close_alert();
        first.await;

        let mut second = dialogs.show_alert("b", DialogType::Info, AlertOptions::default());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(dialogs.alert_state().is_visible);
        assert!(timeout(OBSERVE, &mut second).await.is_err());
    }

    #[tokio::test]
    async fn test_watch_publishes_changes() {
        let dialogs = DialogCoordinator::new();
        let mut rx = dialogs.watch_alert();
        assert!(!rx.borrow_and_update().is_visible);

        let _handle = dialogs.show_alert("hi", DialogType::Warning, AlertOptions::default());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().message, "hi");

        dialogs.close_alert();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_visible);
    }

    #[test]
    fn test_auto_dismiss_without_runtime_is_ignored() {
        let dialogs = DialogCoordinator::new();
        let _handle = dialogs.show_alert(
            "hi",
            DialogType::Info,
            AlertOptions::default().with_auto_dismiss(Duration::from_secs(1)),
        );
        assert!(dialogs.alert_state().is_visible);
    }
}
