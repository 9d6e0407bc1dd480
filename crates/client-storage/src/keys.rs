//! Storage key constants.

/// Storage keys used by the client session
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer credential
    pub const AUTH_TOKEN: &'static str = "auth_token";

    /// Signed-in user record (JSON)
    pub const USER: &'static str = "user";

    /// Every key that belongs to the session and is removed on teardown.
    pub const SESSION: [&'static str; 2] = [Self::AUTH_TOKEN, Self::USER];
}
