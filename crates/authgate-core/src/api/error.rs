use thiserror::Error;

/// Coarse error categories the front end reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local form validation failed; nothing was sent.
    Validation,
    /// Credentials or account state rejected by the backend.
    AuthRejected,
    AlreadyRegistered,
    NetworkOrBackend,
    /// Refresh attempted without a remote session.
    NoActiveSession,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email address not confirmed")]
    EmailNotConfirmed,

    #[error("Email already registered")]
    AlreadyRegistered,

    #[error("Invalid email format")]
    InvalidEmailFormat,

    #[error("No active session to refresh")]
    NoActiveSession,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid backend URL: {0}")]
    InvalidBaseUrl(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Which backend operation produced a failure. The same status code means
/// different things on different endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SignIn,
    SignUp,
    SignOut,
    Refresh,
}

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a structured backend error code. Unknown codes return `None` so the
    /// caller can fall back to the HTTP status.
    pub fn from_code(code: &str, op: Operation) -> Option<Self> {
        let err = match code.to_ascii_lowercase().as_str() {
            "invalid_credentials" | "invalid_grant" => AuthError::InvalidCredentials,
            "email_not_confirmed" => AuthError::EmailNotConfirmed,
            "user_already_exists" | "email_exists" | "already_registered" => {
                AuthError::AlreadyRegistered
            }
            "invalid_email" | "email_address_invalid" => AuthError::InvalidEmailFormat,
            "session_not_found" | "refresh_token_not_found" | "no_session" => {
                AuthError::NoActiveSession
            }
            "unauthorized" if op == Operation::Refresh => AuthError::NoActiveSession,
            _ => return None,
        };
        Some(err)
    }

    pub fn from_status(status: reqwest::StatusCode, op: Operation, message: &str) -> Self {
        let truncated = Self::truncate_body(message);
        match (status.as_u16(), op) {
            (400 | 401, Operation::SignIn) => AuthError::InvalidCredentials,
            (403, Operation::SignIn) => AuthError::EmailNotConfirmed,
            (409, Operation::SignUp) => AuthError::AlreadyRegistered,
            (422, Operation::SignUp) => AuthError::InvalidEmailFormat,
            (401, Operation::Refresh | Operation::SignOut) => AuthError::NoActiveSession,
            (500..=599, _) => AuthError::Backend(format!("Server error: {}", truncated)),
            _ if truncated.is_empty() => {
                AuthError::InvalidResponse(format!("Status {}", status))
            }
            _ => AuthError::Backend(truncated),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::EmailNotConfirmed
            | AuthError::InvalidEmailFormat => ErrorKind::AuthRejected,
            AuthError::AlreadyRegistered => ErrorKind::AlreadyRegistered,
            AuthError::NoActiveSession => ErrorKind::NoActiveSession,
            AuthError::Backend(_)
            | AuthError::Network(_)
            | AuthError::InvalidResponse(_)
            | AuthError::InvalidBaseUrl(_) => ErrorKind::NetworkOrBackend,
        }
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Email atau kata sandi salah".to_string(),
            AuthError::EmailNotConfirmed => {
                "Email belum dikonfirmasi, silakan cek kotak masuk Anda".to_string()
            }
            AuthError::AlreadyRegistered => "Email sudah terdaftar".to_string(),
            AuthError::InvalidEmailFormat => "Format email tidak valid".to_string(),
            AuthError::NoActiveSession => "Silahkan login kembali".to_string(),
            AuthError::Backend(message) if !message.is_empty() => message.clone(),
            AuthError::Network(_) => {
                "Tidak dapat terhubung ke server, coba lagi nanti".to_string()
            }
            _ => "Terjadi kesalahan, coba lagi nanti".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_code_takes_known_values() {
        assert!(matches!(
            AuthError::from_code("invalid_credentials", Operation::SignIn),
            Some(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            AuthError::from_code("EMAIL_NOT_CONFIRMED", Operation::SignIn),
            Some(AuthError::EmailNotConfirmed)
        ));
        assert!(matches!(
            AuthError::from_code("user_already_exists", Operation::SignUp),
            Some(AuthError::AlreadyRegistered)
        ));
        assert!(AuthError::from_code("something_else", Operation::SignIn).is_none());
    }

    #[test]
    fn test_unauthorized_code_only_means_no_session_on_refresh() {
        assert!(matches!(
            AuthError::from_code("unauthorized", Operation::Refresh),
            Some(AuthError::NoActiveSession)
        ));
        assert!(AuthError::from_code("unauthorized", Operation::SignIn).is_none());
    }

    #[test]
    fn test_status_depends_on_operation() {
        assert!(matches!(
            AuthError::from_status(StatusCode::UNAUTHORIZED, Operation::SignIn, ""),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from_status(StatusCode::UNAUTHORIZED, Operation::Refresh, ""),
            AuthError::NoActiveSession
        ));
        assert!(matches!(
            AuthError::from_status(StatusCode::CONFLICT, Operation::SignUp, ""),
            AuthError::AlreadyRegistered
        ));
        assert!(matches!(
            AuthError::from_status(StatusCode::BAD_GATEWAY, Operation::SignIn, "down"),
            AuthError::Backend(_)
        ));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = AuthError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
    }

    #[test]
    fn test_kinds_and_messages() {
        assert_eq!(AuthError::InvalidCredentials.kind(), ErrorKind::AuthRejected);
        assert_eq!(AuthError::EmailNotConfirmed.kind(), ErrorKind::AuthRejected);
        assert_eq!(AuthError::AlreadyRegistered.kind(), ErrorKind::AlreadyRegistered);
        assert_eq!(AuthError::NoActiveSession.kind(), ErrorKind::NoActiveSession);
        assert_eq!(
            AuthError::Backend("boom".into()).kind(),
            ErrorKind::NetworkOrBackend
        );
        assert_eq!(AuthError::AlreadyRegistered.user_message(), "Email sudah terdaftar");
        assert_eq!(AuthError::Backend("Akun dibekukan".into()).user_message(), "Akun dibekukan");
    }
}
