//! Dialog records and display options.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BUTTON_TEXT: &str = "OK";
const DEFAULT_CONFIRM_TITLE: &str = "Confirm Action";
const DEFAULT_CONFIRM_TEXT: &str = "Confirm";
const DEFAULT_CANCEL_TEXT: &str = "Cancel";

/// Visual category of a dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogType {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

/// Optional alert settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertOptions {
    pub title: String,
    pub button_text: String,
    /// Close the alert on its own after this long. `None` or zero disables it.
    pub auto_dismiss: Option<Duration>,
}

impl Default for AlertOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            button_text: DEFAULT_BUTTON_TEXT.to_string(),
            auto_dismiss: None,
        }
    }
}

impl AlertOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_button_text(mut self, button_text: impl Into<String>) -> Self {
        self.button_text = button_text.into();
        self
    }

    pub fn with_auto_dismiss(mut self, after: Duration) -> Self {
        self.auto_dismiss = Some(after);
        self
    }

    /// Auto-dismiss delay, if one is actually requested.
    pub(crate) fn effective_auto_dismiss(&self) -> Option<Duration> {
        self.auto_dismiss.filter(|after| !after.is_zero())
    }
}

/// Optional confirm settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub title: String,
    pub dialog_type: DialogType,
    pub confirm_text: String,
    pub cancel_text: String,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_CONFIRM_TITLE.to_string(),
            dialog_type: DialogType::Warning,
            confirm_text: DEFAULT_CONFIRM_TEXT.to_string(),
            cancel_text: DEFAULT_CANCEL_TEXT.to_string(),
        }
    }
}

impl ConfirmOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_type(mut self, dialog_type: DialogType) -> Self {
        self.dialog_type = dialog_type;
        self
    }

    pub fn with_labels(
        mut self,
        confirm_text: impl Into<String>,
        cancel_text: impl Into<String>,
    ) -> Self {
        self.confirm_text = confirm_text.into();
        self.cancel_text = cancel_text.into();
        self
    }
}

/// Empty labels fall back to the default label.
fn or_default(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

/// Alert record rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub is_visible: bool,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub dialog_type: DialogType,
    pub button_text: String,
    /// Auto-dismiss delay in milliseconds, 0 when disabled.
    pub auto_dismiss_ms: u64,
}

impl Default for AlertState {
    fn default() -> Self {
        Self {
            is_visible: false,
            title: String::new(),
            message: String::new(),
            dialog_type: DialogType::Info,
            button_text: DEFAULT_BUTTON_TEXT.to_string(),
            auto_dismiss_ms: 0,
        }
    }
}

impl AlertState {
    pub(crate) fn shown(message: String, dialog_type: DialogType, options: &AlertOptions) -> Self {
        let auto_dismiss_ms = options
            .effective_auto_dismiss()
            .map(|after| u64::try_from(after.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        Self {
            is_visible: true,
            title: options.title.clone(),
            message,
            dialog_type,
            button_text: or_default(options.button_text.clone(), DEFAULT_BUTTON_TEXT),
            auto_dismiss_ms,
        }
    }
}

/// Confirm record rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmState {
    pub is_visible: bool,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub dialog_type: DialogType,
    pub confirm_text: String,
    pub cancel_text: String,
}

impl Default for ConfirmState {
    fn default() -> Self {
        let options = ConfirmOptions::default();
        Self {
            is_visible: false,
            title: options.title,
            message: String::new(),
            dialog_type: options.dialog_type,
            confirm_text: options.confirm_text,
            cancel_text: options.cancel_text,
        }
    }
}

impl ConfirmState {
    pub(crate) fn shown(message: String, options: ConfirmOptions) -> Self {
        Self {
            is_visible: true,
            title: or_default(options.title, DEFAULT_CONFIRM_TITLE),
            message,
            dialog_type: options.dialog_type,
            confirm_text: or_default(options.confirm_text, DEFAULT_CONFIRM_TEXT),
            cancel_text: or_default(options.cancel_text, DEFAULT_CANCEL_TEXT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let alert = AlertState::default();
        assert!(!alert.is_visible);
        assert_eq!(alert.button_text, "OK");
        assert_eq!(alert.dialog_type, DialogType::Info);
        assert_eq!(alert.auto_dismiss_ms, 0);

        let confirm = ConfirmState::default();
        assert_eq!(confirm.title, "Confirm Action");
        assert_eq!(confirm.dialog_type, DialogType::Warning);
        assert_eq!(confirm.confirm_text, "Confirm");
        assert_eq!(confirm.cancel_text, "Cancel");
    }

    #[test]
    fn test_blank_labels_fall_back() {
        let options = ConfirmOptions::default()
            .with_title("")
            .with_labels("Delete", " ");
        let state = ConfirmState::shown("Delete post?".to_string(), options);

        assert_eq!(state.title, "Confirm Action");
        assert_eq!(state.confirm_text, "Delete");
        assert_eq!(state.cancel_text, "Cancel");
    }

    #[test]
    fn test_zero_auto_dismiss_is_disabled() {
        let options = AlertOptions::default().with_auto_dismiss(Duration::ZERO);
        assert!(options.effective_auto_dismiss().is_none());

        let options = AlertOptions::default().with_auto_dismiss(Duration::from_millis(1500));
        let state = AlertState::shown("Saved".to_string(), DialogType::Success, &options);
        assert_eq!(state.auto_dismiss_ms, 1500);
    }

    #[test]
    fn test_state_serialization() {
        let state = AlertState::shown(
            "Saved".to_string(),
            DialogType::Success,
            &AlertOptions::default().with_title("Done"),
        );
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["type"], "success");
        assert_eq!(json["is_visible"], true);
        assert_eq!(json["title"], "Done");
    }
}
