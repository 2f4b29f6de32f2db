//! reqwest-backed [`Transport`] talking to the GraphQL web API.

use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap};
use std::time::Duration;

use super::{Credentials, PageResult, Request, ResponseLog, TransientKind, Transport};

/// Default API root; endpoint paths are appended to it.
pub const DEFAULT_BASE_URL: &str = "https://x.com/i/api/graphql";

/// User agent of the mobile web client the API expects.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";

/// Blocking HTTP transport with session authentication.
pub struct HttpTransport {
    http: Client,
    base_url: String,
    credentials: Credentials,
    response_log: Option<ResponseLog>,
}

impl HttpTransport {
    /// Build a transport with the given request timeout.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            response_log: None,
        })
    }

    /// Dump every response body into `log`.
    pub fn with_response_log(mut self, log: ResponseLog) -> Self {
        self.response_log = Some(log);
        self
    }

    /// Full URL of an endpoint path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, request: &Request) -> reqwest::Result<reqwest::blocking::Response> {
        self.http
            .get(self.url_for(request.endpoint.path))
            .query(&[
                ("variables", request.variables.as_str()),
                ("features", request.features.as_str()),
            ])
            .header(header::ACCEPT, "*/*")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(header::AUTHORIZATION, self.credentials.authorization_header())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, self.credentials.cookie_header())
            .header(header::REFERER, request.referer.as_str())
            .header("x-csrf-token", self.credentials.csrf_token())
            .header("x-twitter-active-user", "yes")
            .header("x-twitter-auth-type", "OAuth2Session")
            .header("x-twitter-client-language", "en")
            .send()
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, request: &Request) -> PageResult {
        tracing::debug!(endpoint = request.endpoint.name, variables = %request.variables, "Sending request");

        let response = match self.send(request) {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return classify_error(&e),
        };

        if let Some(log) = &self.response_log {
            log.record(&request.log_label, &body);
        }

        match status {
            200..=299 => PageResult::Ok(body),
            429 => PageResult::RateLimited(retry_after),
            _ => PageResult::hard_failure(Some(status), &body),
        }
    }
}

/// Map a reqwest failure onto the transport's outcome classes.
fn classify_error(error: &reqwest::Error) -> PageResult {
    if error.is_timeout() {
        PageResult::Transient(TransientKind::Timeout)
    } else if error.is_connect() || error.is_request() {
        PageResult::Transient(TransientKind::Connection)
    } else {
        PageResult::hard_failure(None, &error.to_string())
    }
}

/// Parse a `retry-after` header given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
