//! Wire types exchanged with the identity backend.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::NULL_TOKEN;

/// Envelope every backend endpoint answers with. Missing fields read as `None`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    /// A missing `success` flag counts as success unless an error is present.
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(self.error.is_none())
    }

    pub fn error_code(&self) -> Option<&str> {
        match self.error {
            Some(ErrorBody::Structured { ref code, .. }) => code.as_deref(),
            _ => None,
        }
    }

    /// Best human-readable text: `message`, then `error.details`, then a plain
    /// string error.
    pub fn error_message(&self) -> String {
        if let Some(ref message) = self.message {
            if !message.is_empty() {
                return message.clone();
            }
        }
        match self.error {
            Some(ErrorBody::Structured {
                details: Some(ref details),
                ..
            }) => details.clone(),
            Some(ErrorBody::Plain(ref text)) => text.clone(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorBody {
    Structured {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        details: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenBody {
    pub access_token: String,
    /// Unix seconds
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Token issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenGrant {
    /// Empty tokens and the `null` literal are not tokens.
    pub(crate) fn from_body(body: TokenBody) -> Option<Self> {
        if body.access_token.is_empty() || body.access_token == NULL_TOKEN {
            return None;
        }
        let expires_at = Utc.timestamp_opt(body.expires_at, 0).single()?;
        Some(Self {
            access_token: body.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn parse<T: DeserializeOwned>(json: &str) -> Envelope<T> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_envelope_generic_without_data() {
        let env: Envelope<TokenBody> = parse(r#"{"success":true,"message":"ok"}"#);
        assert!(env.is_success());
        assert!(env.data.is_none());
        assert!(env.error.is_none());
    }

    #[test]
    fn test_envelope_success_defaults() {
        let env: Envelope<TokenBody> =
            serde_json::from_str(r#"{"data":{"access_token":"t","expires_at":1700000000}}"#)
                .unwrap();
        assert!(env.is_success());

        let env: Envelope<TokenBody> =
            serde_json::from_str(r#"{"error":{"code":"invalid_credentials"}}"#).unwrap();
        assert!(!env.is_success());
        assert_eq!(env.error_code(), Some("invalid_credentials"));
    }

    #[test]
    fn test_envelope_error_message_fallbacks() {
        let env: Envelope<()> =
            serde_json::from_str(r#"{"success":false,"error":{"details":"bad input"}}"#).unwrap();
        assert_eq!(env.error_message(), "bad input");

        let env: Envelope<()> =
            serde_json::from_str(r#"{"success":false,"error":"plain text"}"#).unwrap();
        assert_eq!(env.error_message(), "plain text");
        assert_eq!(env.error_code(), None);
    }

    #[test]
    fn test_token_grant_from_unix_seconds() {
        let grant = TokenGrant::from_body(TokenBody {
            access_token: "abc".into(),
            expires_at: 1_700_000_000,
        })
        .unwrap();
        assert_eq!(grant.expires_at.timestamp(), 1_700_000_000);

        assert!(TokenGrant::from_body(TokenBody {
            access_token: String::new(),
            expires_at: 1_700_000_000,
        })
        .is_none());
    }

    #[test]
    fn test_null_literal_token_rejected() {
        assert!(TokenGrant::from_body(TokenBody {
            access_token: NULL_TOKEN.into(),
            expires_at: 1_700_000_000,
        })
        .is_none());
    }
}
