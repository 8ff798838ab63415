//! authgate core library.
//!
//! Client-side session handling for a single-sign-on login front end:
//! - `api`: identity backend client (sign in, sign up, sign out, refresh)
//! - `store`: expiring credential store ("cookie jar") implementations
//! - `auth`: session lifecycle manager deciding reuse, refresh or re-login
//! - `validation`: local form validation for login and registration
//! - `config`: application configuration
//!
//! Partner applications receive the token as `<url>?token=<value>`, where the
//! literal `null` means no session.

pub mod api;
pub mod auth;
pub mod config;
pub mod outcome;
pub mod store;
pub mod validation;

pub use api::{AuthError, ErrorKind, HttpIdentityClient, IdentityBackend, TokenGrant};
pub use auth::{
    Clock, LoginRequest, ManualClock, RegistrationRequest, Session, SessionManager, SessionState,
    SystemClock,
};
pub use config::{Config, StoreBackend};
pub use outcome::Outcome;
pub use store::{CredentialStore, FileStore, KeyringStore, MemoryStore, StoreKey};
