//! Session lifecycle manager.
//!
//! Decides on every `get_token` call whether the cached token can be reused,
//! must be silently refreshed, or the user has to log in again. Expiry is
//! detected lazily; nothing runs in the background.
//!
//! Every front-end operation resolves to an [`Outcome`]; failures become
//! `success: false` with a displayable message.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Duration;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::request::{LoginRequest, RegistrationRequest};
use super::session::{Session, SessionState};
use crate::api::{AuthError, IdentityBackend};
use crate::outcome::{redirect_with_token, Outcome};
use crate::store::CredentialStore;
use crate::validation::{summarize, validate_login, validate_registration};

/// How long a session outlives its token in the store.
pub const DEFAULT_SESSION_GRACE_HOURS: i64 = 24;

/// In-memory part of the lifecycle that the store cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Refreshing,
    /// Session ended by expiry or failed refresh; only login leaves it.
    Expired,
}

pub struct SessionManager<B> {
    backend: B,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    session_grace: Duration,
    refresh_gate: tokio::sync::Mutex<()>,
    phase: Mutex<Phase>,
    /// Bumped by login and logout. A refresh only persists its grant if the
    /// generation it started under is still current.
    generation: Mutex<u64>,
}

impl<B: IdentityBackend> SessionManager<B> {
    pub fn new(backend: B, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            backend,
            store,
            clock: Arc::new(SystemClock),
            session_grace: Duration::hours(DEFAULT_SESSION_GRACE_HOURS),
            refresh_gate: tokio::sync::Mutex::new(()),
            phase: Mutex::new(Phase::Idle),
            generation: Mutex::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_session_grace(mut self, grace: Duration) -> Self {
        self.session_grace = grace;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn phase(&self) -> Phase {
        self.phase.lock().map(|p| *p).unwrap_or(Phase::Idle)
    }

    fn set_phase(&self, phase: Phase) {
        if let Ok(mut p) = self.phase.lock() {
            *p = phase;
        }
    }

    fn persist(&self, session: &Session) {
        session.save(self.store.as_ref(), self.session_grace);
    }

    fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored session (or drop it with `None`) under a new
    /// generation, invalidating refreshes still in flight.
    fn replace_session(&self, session: Option<&Session>) {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        match session {
            Some(session) => self.persist(session),
            None => Session::clear(self.store.as_ref()),
        }
    }

    /// Persist a refreshed session unless login or logout happened since
    /// `started`.
    fn persist_refreshed(&self, session: &Session, started: u64) -> bool {
        let generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        if *generation != started {
            return false;
        }
        self.persist(session);
        true
    }

    /// Drop the local session and remember that it ended without a logout.
    fn expire(&self) {
        Session::clear(self.store.as_ref());
        self.set_phase(Phase::Expired);
    }

    fn no_token(redirect_url: &str, message: &str) -> Outcome {
        Outcome::failed(message).with_redirect(redirect_with_token(redirect_url, None))
    }

    /// Current lifecycle state. An expired remember-me session still reports
    /// `Active` until the next `get_token` tries to refresh it.
    pub fn state(&self) -> SessionState {
        let phase = self.phase();
        if phase == Phase::Refreshing {
            return SessionState::Refreshing;
        }

        match Session::load(self.store.as_ref()) {
            Some(session) if session.remember_me || !session.is_expired(self.clock.now()) => {
                SessionState::Active(session)
            }
            Some(_) => SessionState::Expired,
            None if phase == Phase::Expired => SessionState::Expired,
            None => SessionState::Anonymous,
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> Outcome {
        let errors = validate_login(request);
        if !errors.is_empty() {
            debug!(fields = errors.len(), "Login form rejected locally");
            return Outcome::failed(summarize(&errors));
        }

        match self.backend.sign_in(&request.email, &request.password).await {
            Ok(grant) => {
                let session = Session {
                    access_token: grant.access_token,
                    expires_at: grant.expires_at,
                    remember_me: request.remember,
                };
                self.replace_session(Some(&session));
                self.set_phase(Phase::Idle);
                info!(
                    remember = session.remember_me,
                    expires_at = %session.expires_at,
                    "Login succeeded"
                );
                Outcome::ok("Login berhasil").with_redirect(redirect_with_token(
                    &request.redirect_url,
                    Some(&session.access_token),
                ))
            }
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Login failed");
                Outcome::failed(e.user_message())
            }
        }
    }

    pub async fn register(&self, request: &RegistrationRequest) -> Outcome {
        let request = request.normalized();
        let errors = validate_registration(&request);
        if !errors.is_empty() {
            debug!(fields = errors.len(), "Registration form rejected locally");
            return Outcome::failed(summarize(&errors));
        }

        match self.backend.sign_up(&request).await {
            Ok(()) => {
                info!("Registration submitted");
                Outcome::ok("Registrasi berhasil, cek email konfirmasi.")
            }
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Registration failed");
                Outcome::failed(e.user_message())
            }
        }
    }

    /// Local session is cleared before the backend is contacted and stays
    /// cleared whatever the backend answers, including a refresh that
    /// completes afterwards.
    pub async fn logout(&self) -> Outcome {
        self.replace_session(None);
        self.set_phase(Phase::Idle);

        match self.backend.sign_out().await {
            Ok(()) | Err(AuthError::NoActiveSession) => {
                info!("Logged out");
                Outcome::ok("Logout berhasil")
            }
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Backend logout failed, local session cleared");
                Outcome::failed(format!("Logout gagal: {}", e.user_message()))
            }
        }
    }

    /// Resolve the redirect for a partner application: the cached token when
    /// valid, a silently refreshed one for expired remember-me sessions, and
    /// `?token=null` otherwise.
    pub async fn get_token(&self, redirect_url: &str) -> Outcome {
        let Some(session) = Session::load(self.store.as_ref()) else {
            // Partial leftovers (e.g. a flag without a token) are not a session.
            Session::clear(self.store.as_ref());
            debug!("No cached token");
            return Self::no_token(redirect_url, "Tidak ada token");
        };

        let now = self.clock.now();
        if !session.is_expired(now) {
            debug!(minutes_left = session.minutes_until_expiry(now), "Cached token valid");
            return Outcome::ok("Token aktif")
                .with_redirect(redirect_with_token(redirect_url, Some(&session.access_token)));
        }

        if !session.remember_me {
            info!("Token expired without remember me");
            self.expire();
            return Self::no_token(redirect_url, "Sesi berakhir, silahkan login kembali");
        }

        match self.refresh_stale(&session).await {
            Ok(fresh) => Outcome::ok("Token diperbarui")
                .with_redirect(redirect_with_token(redirect_url, Some(&fresh.access_token))),
            Err(e) => Self::no_token(redirect_url, &e.user_message()),
        }
    }

    /// Refresh an expired session unless a concurrent caller already did.
    async fn refresh_stale(&self, stale: &Session) -> Result<Session, AuthError> {
        let _gate = self.refresh_gate.lock().await;
        let started = self.generation();

        match Session::load(self.store.as_ref()) {
            Some(current) if current.access_token != stale.access_token => {
                if !current.is_expired(self.clock.now()) {
                    debug!("Token already refreshed by another caller");
                    return Ok(current);
                }
            }
            Some(_) => {}
            None => {
                // Logged out, or another caller's refresh already failed.
                debug!("Session ended while waiting to refresh");
                return Err(AuthError::NoActiveSession);
            }
        }

        self.refresh_locked(stale.remember_me, started).await
    }

    /// Ask the backend for a new token using its existing session.
    /// On failure the local session is cleared and the state becomes
    /// `Expired`.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let _gate = self.refresh_gate.lock().await;
        let started = self.generation();
        let remember_me = Session::load(self.store.as_ref())
            .map(|s| s.remember_me)
            .unwrap_or(false);
        self.refresh_locked(remember_me, started).await
    }

    async fn refresh_locked(&self, remember_me: bool, started: u64) -> Result<Session, AuthError> {
        self.set_phase(Phase::Refreshing);

        match self.backend.refresh().await {
            Ok(grant) => {
                let session = Session {
                    access_token: grant.access_token,
                    expires_at: grant.expires_at,
                    remember_me,
                };
                if !self.persist_refreshed(&session, started) {
                    return self.discard_refresh();
                }
                self.set_phase(Phase::Idle);
                info!(expires_at = %session.expires_at, "Token refreshed");
                Ok(session)
            }
            Err(_) if self.generation() != started => self.discard_refresh(),
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Token refresh failed");
                self.expire();
                Err(e)
            }
        }
    }

    /// The session this refresh was for was replaced by login or logout.
    fn discard_refresh(&self) -> Result<Session, AuthError> {
        self.set_phase(Phase::Idle);
        debug!("Discarding refresh of a replaced session");
        Err(AuthError::NoActiveSession)
    }
}
