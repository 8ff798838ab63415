//! Uniform result shape handed back to the front end.

use serde::{Deserialize, Serialize};

/// Query parameter carrying the token to partner applications.
const TOKEN_PARAM: &str = "token";

/// Literal sent in place of a token when there is no session.
/// Partner applications treat it as "absent", never as a real token.
pub const NULL_TOKEN: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_url: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            redirect_url: None,
        }
    }

    pub fn with_redirect(mut self, redirect_url: String) -> Self {
        self.redirect_url = Some(redirect_url);
        self
    }

    /// True when the redirect carries a real token.
    pub fn is_authenticated(&self) -> bool {
        self.redirect_url
            .as_deref()
            .and_then(token_from_redirect)
            .is_some()
    }
}

/// Append the token to a partner URL.
///
/// The format is a fixed contract with partner applications: plain
/// concatenation of `?token=`, even when the URL already has a query string.
pub fn redirect_with_token(redirect_url: &str, token: Option<&str>) -> String {
    format!(
        "{}?{}={}",
        redirect_url,
        TOKEN_PARAM,
        token.unwrap_or(NULL_TOKEN)
    )
}

/// Extract the token from a redirect built by [`redirect_with_token`].
/// Returns `None` for the `null` literal.
pub fn token_from_redirect(redirect_url: &str) -> Option<&str> {
    let marker = format!("?{}=", TOKEN_PARAM);
    let (_, token) = redirect_url.rsplit_once(marker.as_str())?;
    if token.is_empty() || token == NULL_TOKEN {
        None
    } else {
        Some(token)
    }
}
