//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! identity backend URL, request timeout, default partner redirect and the
//! credential store backend.
//!
//! Configuration is stored at `~/.config/authgate/config.json`. Environment
//! variables (`AUTHGATE_API_URL`, `AUTHGATE_DEFAULT_REDIRECT_URL`,
//! `AUTHGATE_STORE`) override the file.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::{Clock, DEFAULT_SESSION_GRACE_HOURS};
use crate::store::{CredentialStore, FileStore, KeyringStore, MemoryStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "authgate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8181";

/// Partner site used when the caller gives no redirect.
const DEFAULT_REDIRECT_URL: &str = "https://www.kawasan.digital";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

const ENV_API_URL: &str = "AUTHGATE_API_URL";
const ENV_DEFAULT_REDIRECT_URL: &str = "AUTHGATE_DEFAULT_REDIRECT_URL";
const ENV_STORE: &str = "AUTHGATE_STORE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
    /// Nothing survives the process; useful for one-shot runs.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "keyring" => Ok(StoreBackend::Keyring),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!("Unknown credential store: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub default_redirect_url: String,
    pub session_grace_hours: i64,
    pub store: StoreBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            default_redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            session_grace_hours: DEFAULT_SESSION_GRACE_HOURS,
            store: StoreBackend::default(),
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(url) = var(ENV_DEFAULT_REDIRECT_URL).filter(|v| !v.is_empty()) {
            self.default_redirect_url = url;
        }
        if let Some(store) = var(ENV_STORE).filter(|v| !v.is_empty()) {
            self.store = store.parse()?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn session_grace(&self) -> Duration {
        Duration::hours(self.session_grace_hours.max(0))
    }

    /// Build the configured credential store.
    pub fn credential_store(&self, clock: Arc<dyn Clock>) -> Result<Arc<dyn CredentialStore>> {
        let store: Arc<dyn CredentialStore> = match self.store {
            StoreBackend::File => Arc::new(FileStore::with_clock(self.cache_dir()?, clock)),
            StoreBackend::Keyring => Arc::new(KeyringStore::with_service(APP_NAME, clock)),
            StoreBackend::Memory => Arc::new(MemoryStore::with_clock(clock)),
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:8181");
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.default_redirect_url, "https://www.kawasan.digital");
        assert_eq!(config.session_grace(), Duration::hours(24));
        assert_eq!(config.store, StoreBackend::File);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api_base_url":"https://id.example","store":"keyring"}"#)
                .unwrap();
        assert_eq!(config.api_base_url, "https://id.example");
        assert_eq!(config.store, StoreBackend::Keyring);
        assert_eq!(config.request_timeout_secs, 15);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "https://auth.example"),
            (ENV_DEFAULT_REDIRECT_URL, ""),
            (ENV_STORE, "Memory"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_base_url, "https://auth.example");
        assert_eq!(config.default_redirect_url, "https://www.kawasan.digital");
        assert_eq!(config.store, StoreBackend::Memory);
    }

    #[test]
    fn test_unknown_store_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|key| (key == ENV_STORE).then(|| "cloud".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_memory_store_from_config() {
        let config = Config {
            store: StoreBackend::Memory,
            ..Config::default()
        };
        let store = config
            .credential_store(Arc::new(crate::auth::SystemClock))
            .unwrap();
        assert_eq!(store.get(crate::store::StoreKey::AccessToken), None);
    }
}
