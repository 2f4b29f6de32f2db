//! Session credentials for the remote API.
//!
//! The web client authenticates with three values: the public bearer token,
//! the `auth_token` session cookie and the `ct0` CSRF token. The CSRF token is
//! sent twice, as the `x-csrf-token` header and as the `ct0` cookie.

use thiserror::Error;

/// Errors raised while assembling credentials.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("missing {name}: pass --{flag} or set {env}")]
    Missing {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },
}

/// Validated credential triple.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    bearer_token: String,
    auth_token: String,
    csrf_token: String,
}

// Tokens must never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer_token", &"<redacted>")
            .field("auth_token", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build credentials, rejecting any missing or blank value.
    pub fn new(
        bearer_token: Option<String>,
        auth_token: Option<String>,
        csrf_token: Option<String>,
    ) -> Result<Self, CredentialsError> {
        Ok(Self {
            bearer_token: require(bearer_token, "bearer token", "bearer-token", "TWITTER_BEARER_TOKEN")?,
            auth_token: require(auth_token, "auth token", "auth-token", "TWITTER_AUTH_TOKEN")?,
            csrf_token: require(csrf_token, "CSRF token", "csrf-token", "TWITTER_CSRF_TOKEN")?,
        })
    }

    /// Value of the `authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.bearer_token)
    }

    /// Value of the `x-csrf-token` header.
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Value of the `cookie` header carrying the session pair.
    pub fn cookie_header(&self) -> String {
        format!("auth_token={}; ct0={}", self.auth_token, self.csrf_token)
    }
}

fn require(
    value: Option<String>,
    name: &'static str,
    flag: &'static str,
    env: &'static str,
) -> Result<String, CredentialsError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CredentialsError::Missing { name, flag, env }),
    }
}
