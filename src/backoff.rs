//! Retry policies and the retrying fetch loop.
//!
//! This module provides:
//! - `ThrottlePolicy` - wait computation for server throttling
//! - `TransientPolicy` - fixed waits for timeouts and connection failures
//! - `BackoffPolicy` - both of the above plus an optional attempt cap
//! - `Sleeper` - sleep abstraction so loops can be tested without delays
//! - `Fetcher` - drives a [`Transport`] until success or hard failure
//!
//! # Retry Strategy
//!
//! - Throttled: exponential `min(base * 2^n, cap)` or the server's
//!   `retry-after` hint, depending on the policy
//! - Transient: fixed wait (10s timeout, 15s connection), then retry
//! - Hard failure: returned to the caller, never retried
//! - No attempt cap unless `max_attempts` is set
//!
//! The throttle hit counter `n` belongs to the `Fetcher` and lives as long
//! as the run. It is never reset, so sustained throttling makes every later
//! wait longer.

use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::transport::{PageResult, Request, TransientKind, Transport};

/// How long to wait after the server throttled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePolicy {
    /// `min(base * 2^hits, cap)`, ignoring any server hint
    Exponential { base: Duration, cap: Duration },
    /// The server's `retry-after`, or `default` when it sent none
    ServerHint { default: Duration },
}

impl ThrottlePolicy {
    /// Exponential backoff starting at 60s, capped at 600s.
    pub fn exponential() -> Self {
        ThrottlePolicy::Exponential {
            base: Duration::from_secs(60),
            cap: Duration::from_secs(600),
        }
    }

    /// Server-hinted wait, defaulting to 60s.
    pub fn server_hint() -> Self {
        ThrottlePolicy::ServerHint {
            default: Duration::from_secs(60),
        }
    }

    /// Wait for the throttle signal that follows `hits` earlier ones.
    pub fn wait_for(&self, hits: u32, hint: Option<Duration>) -> Duration {
        match *self {
            ThrottlePolicy::Exponential { base, cap } => {
                let factor = 2u32.checked_pow(hits).unwrap_or(u32::MAX);
                base.checked_mul(factor).unwrap_or(cap).min(cap)
            }
            ThrottlePolicy::ServerHint { default } => hint.unwrap_or(default),
        }
    }
}

/// Fixed waits for retryable network failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientPolicy {
    pub timeout_wait: Duration,
    pub connection_wait: Duration,
}

impl Default for TransientPolicy {
    fn default() -> Self {
        Self {
            timeout_wait: Duration::from_secs(10),
            connection_wait: Duration::from_secs(15),
        }
    }
}

impl TransientPolicy {
    pub fn wait_for(&self, kind: TransientKind) -> Duration {
        match kind {
            TransientKind::Timeout => self.timeout_wait,
            TransientKind::Connection => self.connection_wait,
        }
    }
}

/// Complete retry configuration for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub throttle: ThrottlePolicy,
    pub transient: TransientPolicy,
    /// Total attempts per request before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl BackoffPolicy {
    /// Policy used while paging through community members.
    pub fn collection() -> Self {
        Self {
            throttle: ThrottlePolicy::server_hint(),
            transient: TransientPolicy::default(),
            max_attempts: None,
        }
    }

    /// Policy used while checking follow lists.
    pub fn classification() -> Self {
        Self {
            throttle: ThrottlePolicy::exponential(),
            transient: TransientPolicy::default(),
            max_attempts: None,
        }
    }
}

/// Trait for blocking waits between requests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Sleeper that returns immediately and remembers what it was asked for.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested duration, in order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Sum of all requested durations.
    pub fn total(&self) -> Duration {
        self.recorded().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// A request that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request failed ({}): {body_excerpt}", status_label(.status))]
    Hard {
        status: Option<u16>,
        body_excerpt: String,
    },
    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "no response".to_string(),
    }
}

/// Counters kept by a [`Fetcher`] over its lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchStats {
    /// Requests sent, retries included
    pub requests: u64,
    /// Throttle signals received
    pub throttle_hits: u32,
    /// Timeouts and connection failures retried
    pub transient_retries: u64,
    /// Requests that ended in a hard failure
    pub hard_failures: u64,
}

/// Retrying front-end to a [`Transport`].
///
/// One `Fetcher` is built per run and owns that run's throttle counter.
pub struct Fetcher<T, S> {
    transport: T,
    sleeper: S,
    policy: BackoffPolicy,
    stats: FetchStats,
}

impl<T: Transport, S: Sleeper> Fetcher<T, S> {
    pub fn new(transport: T, sleeper: S, policy: BackoffPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
            stats: FetchStats::default(),
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    pub fn throttle_hits(&self) -> u32 {
        self.stats.throttle_hits
    }

    /// Fetch `request`, retrying throttled and transient failures.
    ///
    /// Returns the response body, or the hard failure that ended the attempt.
    pub fn fetch(&mut self, request: &Request) -> Result<String, FetchFailure> {
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            self.stats.requests += 1;

            let wait = match self.transport.fetch(request) {
                PageResult::Ok(body) => return Ok(body),
                PageResult::RateLimited(hint) => {
                    let wait = self.policy.throttle.wait_for(self.stats.throttle_hits, hint);
                    self.stats.throttle_hits = self.stats.throttle_hits.saturating_add(1);
                    tracing::warn!(
                        endpoint = request.endpoint.name,
                        hits = self.stats.throttle_hits,
                        wait_secs = wait.as_secs(),
                        "Rate limited, waiting before retry"
                    );
                    wait
                }
                PageResult::Transient(kind) => {
                    let wait = self.policy.transient.wait_for(kind);
                    self.stats.transient_retries += 1;
                    tracing::warn!(
                        endpoint = request.endpoint.name,
                        kind = %kind,
                        wait_secs = wait.as_secs(),
                        "Request failed, retrying"
                    );
                    wait
                }
                PageResult::HardFailure {
                    status,
                    body_excerpt,
                } => {
                    self.stats.hard_failures += 1;
                    tracing::error!(
                        endpoint = request.endpoint.name,
                        status = ?status,
                        body = %body_excerpt,
                        "Request failed; check auth_token and csrf_token if this is an authorization error"
                    );
                    return Err(FetchFailure::Hard {
                        status,
                        body_excerpt,
                    });
                }
            };

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    self.stats.hard_failures += 1;
                    tracing::error!(
                        endpoint = request.endpoint.name,
                        attempts,
                        "Giving up on request"
                    );
                    return Err(FetchFailure::Exhausted { attempts });
                }
            }

            self.sleeper.sleep(wait);
        }
    }

    /// Pacing delay between requests. Zero durations are skipped.
    pub fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            self.sleeper.sleep(duration);
        }
    }
}
