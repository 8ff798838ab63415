use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use tracing::warn;

use super::{CredentialStore, StoreKey, StoredEntry};
use crate::auth::{Clock, SystemClock};

const SERVICE_NAME: &str = "authgate";

/// Credential store backed by the OS keychain. Each key is one keychain
/// entry holding a JSON `StoredEntry`, so expiry travels with the value.
pub struct KeyringStore {
    service: String,
    clock: Arc<dyn Clock>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME, Arc::new(SystemClock))
    }

    pub fn with_service(service: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            service: service.into(),
            clock,
        }
    }

    fn entry(&self, key: StoreKey) -> Result<Entry> {
        Entry::new(&self.service, key.as_str()).context("Failed to create keyring entry")
    }

    fn write(&self, key: StoreKey, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let record = serde_json::to_string(&StoredEntry {
            value: value.to_string(),
            expires_at,
        })?;
        self.entry(key)?
            .set_password(&record)
            .context("Failed to store credential in keychain")
    }

    fn read(&self, key: StoreKey) -> Result<Option<StoredEntry>> {
        match self.entry(key)?.get_password() {
            Ok(record) => {
                let entry = serde_json::from_str(&record)
                    .context("Failed to parse keychain credential")?;
                Ok(Some(entry))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credential from keychain"),
        }
    }

    fn delete(&self, key: StoreKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn set(&self, key: StoreKey, value: &str, expires_at: DateTime<Utc>) {
        if let Err(e) = self.write(key, value, expires_at) {
            warn!(key = key.as_str(), error = %e, "Failed to persist credential");
        }
    }

    fn get(&self, key: StoreKey) -> Option<String> {
        match self.read(key) {
            Ok(Some(entry)) if entry.is_expired(self.clock.now()) => {
                self.remove(key);
                None
            }
            Ok(Some(entry)) => Some(entry.value),
            Ok(None) => None,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Failed to read credential");
                None
            }
        }
    }

    fn remove(&self, key: StoreKey) {
        if let Err(e) = self.delete(key) {
            warn!(key = key.as_str(), error = %e, "Failed to remove credential");
        }
    }
}
