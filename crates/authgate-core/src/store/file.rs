use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{CredentialStore, StoreKey, StoredEntry};
use crate::auth::{Clock, SystemClock};

/// Credentials file name in cache directory
const STORE_FILE: &str = "credentials.json";

type Entries = HashMap<String, StoredEntry>;

/// Credential store persisted as JSON in the cache directory.
///
/// The file is re-read on every access so a later run of the program sees
/// what an earlier one wrote. Expired entries are pruned whenever the file
/// is rewritten.
pub struct FileStore {
    cache_dir: PathBuf,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self::with_clock(cache_dir, Arc::new(SystemClock))
    }

    pub fn with_clock(cache_dir: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache_dir,
            clock,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(STORE_FILE)
    }

    fn load(path: &Path) -> Result<Entries> {
        if !path.exists() {
            return Ok(Entries::new());
        }
        let contents =
            std::fs::read_to_string(path).context("Failed to read credentials file")?;
        let entries = serde_json::from_str(&contents).context("Failed to parse credentials file")?;
        Ok(entries)
    }

    fn save(path: &Path, entries: &Entries) -> Result<()> {
        if entries.is_empty() {
            if path.exists() {
                std::fs::remove_file(path).context("Failed to remove credentials file")?;
            }
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(path, contents).context("Failed to write credentials file")?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Entries),
    {
        let _guard = self.lock.lock().map_err(|_| anyhow::anyhow!("Store lock poisoned"))?;
        let path = self.path();
        // A corrupt file is replaced rather than blocking every later write.
        let mut entries = Self::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable credentials file");
            Entries::new()
        });
        let now = self.clock.now();
        entries.retain(|_, entry| !entry.is_expired(now));
        f(&mut entries);
        Self::save(&path, &entries)
    }
}

impl CredentialStore for FileStore {
    fn set(&self, key: StoreKey, value: &str, expires_at: DateTime<Utc>) {
        let result = self.update(|entries| {
            entries.insert(
                key.as_str().to_string(),
                StoredEntry {
                    value: value.to_string(),
                    expires_at,
                },
            );
        });
        if let Err(e) = result {
            warn!(key = key.as_str(), error = %e, "Failed to persist credential");
        }
    }

    fn get(&self, key: StoreKey) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        let entries = match Self::load(&self.path()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to load credentials");
                return None;
            }
        };
        let entry = entries.get(key.as_str())?;
        if entry.is_expired(self.clock.now()) {
            debug!(key = key.as_str(), "Stored credential expired");
            return None;
        }
        Some(entry.value.clone())
    }

    fn remove(&self, key: StoreKey) {
        if let Err(e) = self.update(|entries| {
            entries.remove(key.as_str());
        }) {
            warn!(key = key.as_str(), error = %e, "Failed to remove credential");
        }
    }
}
