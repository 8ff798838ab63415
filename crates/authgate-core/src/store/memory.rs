use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::{CredentialStore, StoreKey, StoredEntry};
use crate::auth::{Clock, SystemClock};

/// In-process credential store. Shared by cloning the `Arc` it is usually
/// wrapped in; every write is visible to all holders immediately.
pub struct MemoryStore {
    entries: Mutex<HashMap<StoreKey, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|e| !e.is_expired(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn set(&self, key: StoreKey, value: &str, expires_at: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                StoredEntry {
                    value: value.to_string(),
                    expires_at,
                },
            );
        }
    }

    fn get(&self, key: StoreKey) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().ok()?;
        match entries.get(&key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(&key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn remove(&self, key: StoreKey) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&key);
        }
    }
}
