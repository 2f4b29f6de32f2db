//! Structured progress for collection and classification runs.
//!
//! The engine reports plain data ([`PageProgress`], [`AccountProgress`])
//! through a [`ProgressObserver`]; rendering is left to the observer.
//! [`StderrReporter`] is the terminal renderer used by the binary.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use crate::classifier::Outcome;

/// Number of recent batches the rate average is computed over.
pub const RATE_WINDOW: usize = 10;

/// Rolling throughput over the most recent batches.
#[derive(Debug, Clone)]
pub struct RateWindow {
    samples: VecDeque<(u64, Duration)>,
    capacity: usize,
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new(RATE_WINDOW)
    }
}

impl RateWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record that `items` were processed in `elapsed`.
    pub fn push(&mut self, items: u64, elapsed: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((items, elapsed));
    }

    /// Items per minute over the window; `None` until time has passed.
    pub fn per_minute(&self) -> Option<f64> {
        let items: u64 = self.samples.iter().map(|(n, _)| n).sum();
        let secs: f64 = self.samples.iter().map(|(_, d)| d.as_secs_f64()).sum();
        if secs > 0.0 {
            Some(items as f64 / secs * 60.0)
        } else {
            None
        }
    }

    /// Estimated time to process `remaining` items at the current rate.
    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        let rate = self.per_minute()?;
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate * 60.0))
    }
}

/// Progress after one committed page of members.
#[derive(Debug, Clone, PartialEq)]
pub struct PageProgress {
    /// 1-based page number within the run
    pub page: u64,
    pub members_in_page: usize,
    /// Members from this page that were new
    pub saved: usize,
    /// Members from this page that were already known
    pub duplicates: usize,
    /// Members written by this run so far
    pub collected: u64,
    /// Existing plus collected
    pub total: u64,
    pub community_size: Option<u64>,
    pub batch_duration: Duration,
    pub rate_per_minute: Option<f64>,
    pub remaining: Option<u64>,
    pub eta: Option<Duration>,
    pub throttle_hits: u32,
}

/// Progress after one classified account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountProgress {
    /// 1-based position in this run's work list
    pub index: usize,
    pub total: usize,
    pub username: String,
    pub outcome: Outcome,
    pub following: usize,
    pub not_following: usize,
    pub rate_per_minute: Option<f64>,
    pub eta: Option<Duration>,
    pub throttle_hits: u32,
}

/// Receives progress events from a run.
pub trait ProgressObserver {
    fn on_page(&self, _progress: &PageProgress) {}

    fn on_account(&self, _progress: &AccountProgress) {}
}

impl<O: ProgressObserver + ?Sized> ProgressObserver for &O {
    fn on_page(&self, progress: &PageProgress) {
        (**self).on_page(progress)
    }

    fn on_account(&self, progress: &AccountProgress) {
        (**self).on_account(progress)
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// Progress lines on stderr.
#[derive(Debug, Clone, Copy)]
pub struct StderrReporter {
    show_output: bool,
}

impl Default for StderrReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StderrReporter {
    pub fn new() -> Self {
        Self { show_output: true }
    }

    /// Reporter with output disabled.
    pub fn quiet() -> Self {
        Self { show_output: false }
    }
}

impl ProgressObserver for StderrReporter {
    fn on_page(&self, p: &PageProgress) {
        if !self.show_output {
            return;
        }
        eprintln!("{}", format_page(p));
    }

    fn on_account(&self, p: &AccountProgress) {
        if !self.show_output {
            return;
        }
        eprint!("\r\x1b[2K{}", format_account(p));
        if p.index == p.total {
            eprintln!();
        }
        let _ = io::stderr().flush();
    }
}

/// One-line summary of a page.
pub fn format_page(p: &PageProgress) -> String {
    let mut line = format!(
        "Page {}: {} members, {} new, {} duplicate | total {}",
        p.page, p.members_in_page, p.saved, p.duplicates, p.total
    );
    if let Some(size) = p.community_size {
        line.push_str(&format!("/{}", size));
    }
    if let Some(rate) = p.rate_per_minute {
        line.push_str(&format!(" | {:.1}/min", rate));
    }
    if let Some(eta) = p.eta {
        line.push_str(&format!(" | ETA {}", format_duration(eta)));
    }
    if p.throttle_hits > 0 {
        line.push_str(&format!(" | rate limited {}x", p.throttle_hits));
    }
    line
}

/// One-line summary of a classified account.
pub fn format_account(p: &AccountProgress) -> String {
    let mut line = format!(
        "[{}/{}] @{} {} | {} following, {} not",
        p.index,
        p.total,
        p.username,
        p.outcome.label(),
        p.following,
        p.not_following
    );
    if let Some(eta) = p.eta {
        line.push_str(&format!(" | ETA {}", format_duration(eta)));
    }
    line
}

/// Compact human duration: `1h 02m`, `3m 05s`, `42s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}
