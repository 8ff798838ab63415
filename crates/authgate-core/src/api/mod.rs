//! Identity backend client module.
//!
//! This module provides the `IdentityBackend` trait the session manager is
//! built against, and `HttpIdentityClient`, which talks to the REST identity
//! provider (`/auth/login`, `/auth/register`, `/auth/logout`,
//! `/auth/refresh-token`).
//!
//! Backend failures are normalized into `AuthError` before leaving this module.
//! `PersistentCookies` keeps the backend's session cookie across runs.

pub mod client;
pub mod cookies;
pub mod error;
pub mod types;

pub use client::{HttpIdentityClient, IdentityBackend};
pub use cookies::PersistentCookies;
pub use error::{AuthError, ErrorKind, Operation};
pub use types::TokenGrant;
