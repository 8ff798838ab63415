//! Session lifecycle module.
//!
//! This module provides:
//! - `SessionManager`: login, register, logout and token resolution with
//!   lazy expiry detection and silent refresh for remember-me sessions
//! - `Session`: the persisted token with its expiry bookkeeping
//! - `Clock`: time source, swappable in tests
//!
//! Remember me gates refresh: an expired session without it always requires
//! a fresh login.

pub mod clock;
pub mod manager;
pub mod request;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{SessionManager, DEFAULT_SESSION_GRACE_HOURS};
pub use request::{LoginRequest, RegistrationRequest};
pub use session::{Session, SessionState};
