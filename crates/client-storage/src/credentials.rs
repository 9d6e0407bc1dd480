//! Typed access to the persisted session credential and user record.

use crate::{KeyValueStore, StorageKeys, StorageResult};
use serde_json::Value;
use std::sync::Arc;

/// High-level API over the two session keys.
///
/// Cloning is cheap; every clone shares the same backend, which is how the
/// gateway and the session controller observe the same persisted session.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Create a credential store over the given backend
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Retrieve the bearer token
    pub fn get_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::AUTH_TOKEN)
    }

    /// Retrieve and decode the user record
    pub fn get_user(&self) -> StorageResult<Option<Value>> {
        match self.storage.get(StorageKeys::USER)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the user record, leaving the token alone
    pub fn set_user(&self, user: &Value) -> StorageResult<()> {
        let encoded = serde_json::to_string(user)?;
        self.storage.set(StorageKeys::USER, &encoded)
    }

    /// Store token and user together
    pub fn set_session(&self, token: &str, user: &Value) -> StorageResult<()> {
        let encoded = serde_json::to_string(user)?;
        self.storage.set_many(&[
            (StorageKeys::AUTH_TOKEN, token),
            (StorageKeys::USER, &encoded),
        ])
    }

    /// Remove token and user together
    pub fn clear_session(&self) -> StorageResult<()> {
        self.storage.delete_many(&StorageKeys::SESSION)
    }

    /// True when both the token and the user record are present
    pub fn has_session(&self) -> StorageResult<bool> {
        Ok(self.storage.has(StorageKeys::AUTH_TOKEN)? && self.storage.has(StorageKeys::USER)?)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
