//! Durable key/value storage for the web client session.
//!
//! This crate provides:
//! - The [`KeyValueStore`] trait every backend implements
//! - [`MemoryStore`] for ephemeral sessions and tests
//! - [`FileStore`], a JSON file that survives restarts
//! - [`CredentialStore`], the typed view over the bearer token and user record

mod credentials;
mod file;
mod keys;
mod memory;
mod traits;

pub use credentials::CredentialStore;
pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
