//! Backend session cookies that outlive the process.
//!
//! The identity backend keeps its refresh session in an HTTP cookie. Each CLI
//! run builds a new client, so the jar is mirrored into the credential store
//! under [`StoreKey::BackendCookies`] and replayed on startup.

use std::sync::Arc;

use chrono::Duration;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;
use tracing::{debug, warn};

use crate::auth::Clock;
use crate::store::{CredentialStore, StoreKey};

pub struct PersistentCookies {
    jar: Jar,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    /// Store lifetime of a freshly received cookie. `Session::save` moves it
    /// to the session's own horizon once the grant is persisted.
    lifetime: Duration,
    /// URL whose cookies are mirrored; every endpoint lives under it.
    scope: Url,
}

impl PersistentCookies {
    /// Build the jar, replaying whatever an earlier run left in the store.
    pub fn load(
        scope: Url,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        lifetime: Duration,
    ) -> Self {
        let jar = Jar::default();
        if let Some(saved) = store.get(StoreKey::BackendCookies) {
            let mut restored = 0;
            // Only name=value pairs are stored; restored cookies live at the
            // root path so a `Path=/` removal from the backend matches them.
            for pair in saved.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                jar.add_cookie_str(&format!("{}; Path=/", pair), &scope);
                restored += 1;
            }
            debug!(cookies = restored, "Restored backend session cookies");
        }

        Self {
            jar,
            store,
            clock,
            lifetime,
            scope,
        }
    }

    fn persist(&self) {
        match self.jar.cookies(&self.scope) {
            Some(header) => match header.to_str() {
                Ok(value) => {
                    let horizon = self.clock.now() + self.lifetime;
                    self.store.set(StoreKey::BackendCookies, value, horizon);
                }
                Err(e) => warn!(error = %e, "Backend cookie is not valid text, not persisted"),
            },
            None => self.store.remove(StoreKey::BackendCookies),
        }
    }
}

impl CookieStore for PersistentCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.jar.set_cookies(cookie_headers, url);
        self.persist();
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}
