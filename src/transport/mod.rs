//! Single-request transport for the remote GraphQL API.
//!
//! A [`Transport`] issues exactly one HTTP request and classifies what came
//! back. It never retries and never sleeps; that is the job of
//! [`crate::backoff::Fetcher`], which drives a transport in a loop.
//!
//! # Outcome classes
//!
//! - [`PageResult::Ok`] - HTTP success, body handed to the caller for parsing
//! - [`PageResult::RateLimited`] - HTTP 429, with the server's `retry-after` if any
//! - [`PageResult::Transient`] - timeout or connection failure
//! - [`PageResult::HardFailure`] - any other non-success status, never retried

pub mod auth;
pub mod http;
pub mod response_log;

pub use auth::{Credentials, CredentialsError};
pub use http::{HttpTransport, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use response_log::ResponseLog;

use serde_json::Value;
use std::time::Duration;

/// Maximum number of body characters kept in a hard-failure excerpt.
pub const BODY_EXCERPT_LEN: usize = 200;

/// A GraphQL operation on the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Operation name, used for log labels
    pub name: &'static str,
    /// Path below the API base URL (`<query id>/<operation>`)
    pub path: &'static str,
}

/// One fully described request: endpoint plus serialized GraphQL inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub endpoint: Endpoint,
    /// JSON-encoded `variables` query parameter
    pub variables: String,
    /// JSON-encoded `features` query parameter
    pub features: String,
    /// Referer header the web client would send for this call
    pub referer: String,
    /// Prefix for the raw-response log file name
    pub log_label: String,
}

impl Request {
    /// Build a request from already-serializable inputs.
    pub fn new(
        endpoint: Endpoint,
        variables: &impl serde::Serialize,
        features: &Value,
        referer: impl Into<String>,
        log_label: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            variables: serde_json::to_string(variables).unwrap_or_else(|_| "{}".to_string()),
            features: features.to_string(),
            referer: referer.into(),
            log_label: log_label.into(),
        }
    }
}

/// Kind of a retryable network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientKind {
    /// The request did not complete within the client timeout
    Timeout,
    /// The connection could not be established or was reset
    Connection,
}

impl std::fmt::Display for TransientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransientKind::Timeout => write!(f, "timeout"),
            TransientKind::Connection => write!(f, "connection error"),
        }
    }
}

/// Classified outcome of a single request.
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    /// Success; the raw response body
    Ok(String),
    /// Server signalled throttling; `retry-after` hint if it sent one
    RateLimited(Option<Duration>),
    /// Timeout or connection failure
    Transient(TransientKind),
    /// Any other failure. `status` is `None` when no HTTP response arrived.
    HardFailure {
        status: Option<u16>,
        body_excerpt: String,
    },
}

impl PageResult {
    /// Build a hard failure, truncating the body to [`BODY_EXCERPT_LEN`] characters.
    pub fn hard_failure(status: Option<u16>, body: &str) -> Self {
        PageResult::HardFailure {
            status,
            body_excerpt: excerpt(body),
        }
    }
}

/// Truncate a response body for log output without splitting a character.
pub fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

/// Issues one request and classifies its outcome.
pub trait Transport {
    fn fetch(&self, request: &Request) -> PageResult;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch(&self, request: &Request) -> PageResult {
        (**self).fetch(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch(&self, request: &Request) -> PageResult {
        (**self).fetch(request)
    }
}
