//! Expiring credential storage ("cookie jar").
//!
//! This module provides:
//! - `CredentialStore`: the best-effort get/set/remove contract
//! - `MemoryStore`: in-process jar
//! - `FileStore`: JSON file in the cache directory, persists across runs
//! - `KeyringStore`: OS keychain entries via keyring
//!
//! Writes never report failure to the caller; they are logged instead.
//! Everything held here is readable by the local user.

pub mod file;
pub mod keyring;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use self::keyring::KeyringStore;
pub use file::FileStore;
pub use memory::MemoryStore;

/// The fixed set of keys the session manager persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    ExpiresAt,
    RememberMe,
    /// `Cookie` header value carrying the backend's refresh session.
    BackendCookies,
}

impl StoreKey {
    pub const ALL: [StoreKey; 4] = [
        StoreKey::AccessToken,
        StoreKey::ExpiresAt,
        StoreKey::RememberMe,
        StoreKey::BackendCookies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AccessToken => "access_token",
            StoreKey::ExpiresAt => "expires_at",
            StoreKey::RememberMe => "remember_me",
            StoreKey::BackendCookies => "backend_cookies",
        }
    }
}

pub trait CredentialStore: Send + Sync {
    /// Write `value`, replacing any previous one. The entry disappears once
    /// `expires_at` has passed.
    fn set(&self, key: StoreKey, value: &str, expires_at: DateTime<Utc>);

    /// Read a value; `None` if never set, removed or expired.
    fn get(&self, key: StoreKey) -> Option<String>;

    /// Idempotent delete.
    fn remove(&self, key: StoreKey);

    fn clear(&self) {
        for key in StoreKey::ALL {
            self.remove(key);
        }
    }
}

/// A stored value with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
