//! Client for the remote identity provider.
//!
//! `IdentityBackend` is the seam the session manager depends on;
//! `HttpIdentityClient` is the production implementation speaking the
//! backend's JSON envelope over HTTP.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, ClientBuilder, Response, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, warn};

use super::cookies::PersistentCookies;
use super::error::Operation;
use super::types::{Envelope, LoginBody, TokenBody};
use super::{AuthError, TokenGrant};
use crate::auth::{Clock, RegistrationRequest};
use crate::config::Config;
use crate::store::CredentialStore;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const LOGOUT_PATH: &str = "/auth/logout";
const REFRESH_PATH: &str = "/auth/refresh-token";

/// Remote identity operations. Every failure is already mapped to an
/// [`AuthError`] variant, so callers never inspect backend wording.
pub trait IdentityBackend: Send + Sync {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<TokenGrant, AuthError>> + Send;

    fn sign_up(
        &self,
        request: &RegistrationRequest,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Requires an existing remote session; fails with
    /// [`AuthError::NoActiveSession`] otherwise.
    fn refresh(&self) -> impl Future<Output = Result<TokenGrant, AuthError>> + Send;
}

/// HTTP identity client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the cookie store holding the backend session.
#[derive(Clone)]
pub struct HttpIdentityClient {
    client: Client,
    base_url: String,
}

impl HttpIdentityClient {
    /// Client whose backend session cookies live only as long as the process.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        Self::build(base_url.into(), Client::builder().timeout(timeout).cookie_store(true))
    }

    /// Client whose backend session cookies are kept in `store`, so a later
    /// process can still refresh or revoke the session.
    pub fn with_persistent_cookies(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        lifetime: chrono::Duration,
    ) -> Result<Self, AuthError> {
        let base_url = base_url.into();
        let scope = Self::cookie_scope(&base_url)?;
        let cookies = PersistentCookies::load(scope, store, clock, lifetime);
        Self::build(
            base_url,
            Client::builder()
                .timeout(timeout)
                .cookie_provider(Arc::new(cookies)),
        )
    }

    /// Production client: persistent cookies in the configured store.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        Self::with_persistent_cookies(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            store,
            clock,
            config.session_grace(),
        )
    }

    fn build(base_url: String, builder: ClientBuilder) -> Result<Self, AuthError> {
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Cookies are mirrored for the refresh endpoint, which every other
    /// endpoint shares a path prefix with.
    fn cookie_scope(base_url: &str) -> Result<Url, AuthError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH);
        Url::parse(&url).map_err(|e| AuthError::InvalidBaseUrl(format!("{}: {}", base_url, e)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>, op: Operation) -> Result<Option<T>, AuthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, ?op, "POST");

        let mut request = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        Self::check_response(response, op).await
    }

    /// Decode the envelope, turning any failure into an `AuthError`.
    async fn check_response<T: DeserializeOwned>(
        response: Response,
        op: Operation,
    ) -> Result<Option<T>, AuthError> {
        let status = response.status();
        let text = response.text().await?;

        if text.trim().is_empty() {
            if status.is_success() {
                return Ok(None);
            }
            return Err(Self::rejected(status, op, AuthError::from_status(status, op, "")));
        }

        let parse_err = match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) if status.is_success() && envelope.is_success() => {
                return Ok(envelope.data)
            }
            Ok(envelope) => return Err(Self::rejection(status, op, &envelope)),
            Err(e) => e,
        };

        // An error envelope whose `data` has another shape still carries a
        // usable `error.code`.
        match serde_json::from_str::<Envelope<IgnoredAny>>(&text) {
            Ok(envelope) if !(status.is_success() && envelope.is_success()) => {
                Err(Self::rejection(status, op, &envelope))
            }
            _ if status.is_success() => Err(AuthError::InvalidResponse(parse_err.to_string())),
            _ => Err(Self::rejected(status, op, AuthError::from_status(status, op, &text))),
        }
    }

    fn rejection<D>(status: StatusCode, op: Operation, envelope: &Envelope<D>) -> AuthError {
        let err = envelope
            .error_code()
            .and_then(|code| AuthError::from_code(code, op))
            .unwrap_or_else(|| AuthError::from_status(status, op, &envelope.error_message()));
        Self::rejected(status, op, err)
    }

    fn rejected(status: StatusCode, op: Operation, err: AuthError) -> AuthError {
        warn!(status = %status, ?op, error = %err, "Identity backend rejected request");
        err
    }

    fn expect_grant(data: Option<TokenBody>) -> Result<TokenGrant, AuthError> {
        data.and_then(TokenGrant::from_body).ok_or_else(|| {
            AuthError::InvalidResponse("Response did not contain an access token".to_string())
        })
    }
}

impl IdentityBackend for HttpIdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenGrant, AuthError> {
        let body = LoginBody { email, password };
        let data: Option<TokenBody> = self.post(LOGIN_PATH, Some(&body), Operation::SignIn).await?;
        Self::expect_grant(data)
    }

    async fn sign_up(&self, request: &RegistrationRequest) -> Result<(), AuthError> {
        let _: Option<serde_json::Value> = self
            .post(REGISTER_PATH, Some(request), Operation::SignUp)
            .await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let _: Option<serde_json::Value> = self
            .post::<(), _>(LOGOUT_PATH, None, Operation::SignOut)
            .await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<TokenGrant, AuthError> {
        let data: Option<TokenBody> = self
            .post::<(), _>(REFRESH_PATH, None, Operation::Refresh)
            .await?;
        // A successful envelope without a token means the backend had nothing
        // to refresh.
        data.and_then(TokenGrant::from_body)
            .ok_or(AuthError::NoActiveSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;
    use crate::auth::SystemClock;
    use crate::store::{MemoryStore, StoreKey};
    use mockito::{Matcher, Server, ServerGuard};

    fn client(server: &ServerGuard) -> HttpIdentityClient {
        HttpIdentityClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_returns_grant() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "email": "budi@example.com",
                "password": "Rahasia#123"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success":true,"message":"ok","data":{"access_token":"tok-1","expires_at":1700000000}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let grant = client(&server)
            .sign_in("budi@example.com", "Rahasia#123")
            .await
            .unwrap();
        assert_eq!(grant.access_token, "tok-1");
        assert_eq!(grant.expires_at.timestamp(), 1_700_000_000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sign_in_maps_error_code() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(400)
            .with_body(
                r#"{"success":false,"message":"Email not confirmed","error":{"code":"email_not_confirmed"}}"#,
            )
            .create_async()
            .await;

        let err = client(&server).sign_in("a@b.co", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailNotConfirmed));
    }

    #[tokio::test]
    async fn test_sign_in_falls_back_to_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"success":false,"message":"whatever the backend says"}"#)
            .create_async()
            .await;

        let err = client(&server).sign_in("a@b.co", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_up_already_registered() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/register")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "first_name": "Budi",
                "email": "budi@example.com"
            })))
            .with_status(409)
            .with_body(r#"{"success":false,"message":"User already registered"}"#)
            .create_async()
            .await;

        let request = RegistrationRequest {
            first_name: "Budi".into(),
            last_name: "Santoso".into(),
            email: "budi@example.com".into(),
            password: "Rahasia#123".into(),
            phone: None,
        };
        let err = client(&server).sign_up(&request).await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_sign_out_with_empty_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/logout")
            .with_status(204)
            .create_async()
            .await;

        client(&server).sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/refresh-token")
            .with_status(401)
            .with_body(r#"{"success":false,"message":"Refresh gagal"}"#)
            .create_async()
            .await;

        let err = client(&server).refresh().await.unwrap_err();
        assert!(matches!(err, AuthError::NoActiveSession));
    }

    #[tokio::test]
    async fn test_refresh_sends_backend_cookie() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_header("set-cookie", "refresh_token=r1; Path=/")
            .with_body(r#"{"success":true,"data":{"access_token":"tok-1","expires_at":1700000000}}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh-token")
            .match_header("cookie", Matcher::Regex("refresh_token=r1".into()))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"access_token":"tok-2","expires_at":1700003600}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server);
        client.sign_in("a@b.co", "x").await.unwrap();
        let grant = client.refresh().await.unwrap();
        assert_eq!(grant.access_token, "tok-2");
        refresh.assert_async().await;
    }

    fn persistent_client(server: &ServerGuard, store: Arc<MemoryStore>) -> HttpIdentityClient {
        HttpIdentityClient::with_persistent_cookies(
            server.url(),
            Duration::from_secs(5),
            store,
            Arc::new(SystemClock),
            chrono::Duration::hours(24),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_from_next_run_reuses_stored_cookie() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_header("set-cookie", "refresh_token=r1; Path=/; HttpOnly")
            .with_body(r#"{"success":true,"data":{"access_token":"tok-1","expires_at":1700000000}}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh-token")
            .match_header("cookie", Matcher::Regex("refresh_token=r1".into()))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"access_token":"tok-2","expires_at":1700003600}}"#)
            .expect(1)
            .create_async()
            .await;
        let logout = server
            .mock("POST", "/auth/logout")
            .match_header("cookie", Matcher::Regex("refresh_token=r1".into()))
            .with_status(200)
            .with_header("set-cookie", "refresh_token=; Path=/; Max-Age=0")
            .with_body(r#"{"success":true}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::new());
        persistent_client(&server, store.clone())
            .sign_in("a@b.co", "x")
            .await
            .unwrap();
        assert!(store.get(StoreKey::BackendCookies).is_some());

        // A new client, as built by the next process.
        let next_run = persistent_client(&server, store.clone());
        let grant = next_run.refresh().await.unwrap();
        assert_eq!(grant.access_token, "tok-2");
        refresh.assert_async().await;

        persistent_client(&server, store.clone()).sign_out().await.unwrap();
        logout.assert_async().await;
        assert_eq!(store.get(StoreKey::BackendCookies), None);
    }

    #[tokio::test]
    async fn test_error_code_read_when_data_has_other_shape() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(400)
            .with_body(
                r#"{"success":false,"data":"n/a","error":{"code":"email_not_confirmed"}}"#,
            )
            .create_async()
            .await;

        let err = client(&server).sign_in("a@b.co", "x").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailNotConfirmed));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpIdentityClient::with_persistent_cookies(
            "not a url",
            Duration::from_secs(1),
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            chrono::Duration::hours(1),
        );
        assert!(matches!(result, Err(AuthError::InvalidBaseUrl(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_backend_kind() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client(&server).sign_in("a@b.co", "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkOrBackend);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpIdentityClient::new("http://localhost:8181/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8181");
        assert_eq!(client.url(LOGIN_PATH), "http://localhost:8181/auth/login");
    }
}
