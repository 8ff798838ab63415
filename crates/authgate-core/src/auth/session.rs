use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::outcome::NULL_TOKEN;
use crate::store::{CredentialStore, StoreKey};

/// Token persisted between runs, together with its expiry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
}

/// Where the session lifecycle currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Active(Session),
    Refreshing,
    Expired,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        self.time_until_expiry(now).num_minutes().max(0)
    }

    /// How long the store keeps this session. Entries outlive the token by
    /// `grace` so an expired session is still seen (and, with remember me,
    /// refreshed) instead of silently vanishing.
    pub fn store_horizon(&self, grace: Duration) -> DateTime<Utc> {
        self.expires_at + grace
    }

    /// Load the session from the store. Returns `None` when the token is
    /// missing, is the `null` literal, or the bookkeeping is unreadable.
    pub fn load(store: &dyn CredentialStore) -> Option<Self> {
        let access_token = store.get(StoreKey::AccessToken)?;
        if access_token.is_empty() || access_token == NULL_TOKEN {
            return None;
        }
        let expires_at = store
            .get(StoreKey::ExpiresAt)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc))?;
        let remember_me = store.get(StoreKey::RememberMe).as_deref() == Some("true");

        Some(Self {
            access_token,
            expires_at,
            remember_me,
        })
    }

    /// Write the session. The backend cookie received with the grant is
    /// moved to the same horizon.
    pub fn save(&self, store: &dyn CredentialStore, grace: Duration) {
        let horizon = self.store_horizon(grace);
        store.set(StoreKey::AccessToken, &self.access_token, horizon);
        store.set(StoreKey::ExpiresAt, &self.expires_at.to_rfc3339(), horizon);
        store.set(
            StoreKey::RememberMe,
            if self.remember_me { "true" } else { "false" },
            horizon,
        );
        if let Some(cookies) = store.get(StoreKey::BackendCookies) {
            store.set(StoreKey::BackendCookies, &cookies, horizon);
        }
    }

    pub fn clear(store: &dyn CredentialStore) {
        store.clear();
    }
}
