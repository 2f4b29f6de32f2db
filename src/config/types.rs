//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backoff::{BackoffPolicy, ThrottlePolicy, TransientPolicy};
use crate::transport::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

pub fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub fn default_timeout_secs() -> u64 {
    30
}

pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Output file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Member table written by `collect` and read by `classify`
    #[serde(default = "default_members_file")]
    pub members_file: String,
    /// Directory for raw response dumps
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
    #[serde(default = "default_log_responses")]
    pub log_responses: bool,
}

pub fn default_members_file() -> String {
    "twitter_community_members.csv".to_string()
}

pub fn default_logs_dir() -> String {
    "twitter_response_logs".to_string()
}

pub fn default_log_responses() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            members_file: default_members_file(),
            logs_dir: default_logs_dir(),
            log_responses: default_log_responses(),
        }
    }
}

/// Delays between requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_account_delay_ms")]
    pub account_delay_ms: u64,
    /// Classification results are flushed after this many accounts
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
}

pub fn default_page_delay_ms() -> u64 {
    1000
}

pub fn default_account_delay_ms() -> u64 {
    2000
}

pub fn default_flush_every() -> usize {
    5
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            account_delay_ms: default_account_delay_ms(),
            flush_every: default_flush_every(),
        }
    }
}

impl PacingConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn account_delay(&self) -> Duration {
        Duration::from_millis(self.account_delay_ms)
    }
}

/// Retry waits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_throttle_base_secs")]
    pub throttle_base_secs: u64,
    #[serde(default = "default_throttle_cap_secs")]
    pub throttle_cap_secs: u64,
    /// Wait when the server throttles without a retry-after header
    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: u64,
    #[serde(default = "default_timeout_wait_secs")]
    pub timeout_wait_secs: u64,
    #[serde(default = "default_connection_wait_secs")]
    pub connection_wait_secs: u64,
    /// Attempts per request before giving up; unset retries forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

pub fn default_throttle_base_secs() -> u64 {
    60
}

pub fn default_throttle_cap_secs() -> u64 {
    600
}

pub fn default_retry_after_secs() -> u64 {
    60
}

pub fn default_timeout_wait_secs() -> u64 {
    10
}

pub fn default_connection_wait_secs() -> u64 {
    15
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            throttle_base_secs: default_throttle_base_secs(),
            throttle_cap_secs: default_throttle_cap_secs(),
            default_retry_after_secs: default_retry_after_secs(),
            timeout_wait_secs: default_timeout_wait_secs(),
            connection_wait_secs: default_connection_wait_secs(),
            max_attempts: None,
        }
    }
}

impl BackoffConfig {
    fn transient(&self) -> TransientPolicy {
        TransientPolicy {
            timeout_wait: Duration::from_secs(self.timeout_wait_secs),
            connection_wait: Duration::from_secs(self.connection_wait_secs),
        }
    }

    /// Policy for paging through members: waits for the server's hint.
    pub fn collection_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            throttle: ThrottlePolicy::ServerHint {
                default: Duration::from_secs(self.default_retry_after_secs),
            },
            transient: self.transient(),
            max_attempts: self.max_attempts,
        }
    }

    /// Policy for follow checks: exponential backoff.
    pub fn classification_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            throttle: ThrottlePolicy::Exponential {
                base: Duration::from_secs(self.throttle_base_secs),
                cap: Duration::from_secs(self.throttle_cap_secs),
            },
            transient: self.transient(),
            max_attempts: self.max_attempts,
        }
    }
}
