//! Resumable community member collection.
//!
//! The collector is a small state machine:
//!
//! ```text
//! Start -> Fetching -> (Fetching | Done | Aborted)
//! ```
//!
//! Each fetched page goes through the dedup sink (append mode) and is
//! flushed to the member table. The checkpoint is saved only once the
//! page's members are durable, so a crash loses at most the page in flight.
//!
//! A page with no members ends the run as `Aborted`, after saving the
//! page's next cursor so a resume does not fetch the same empty page again.
//! When that page carries no cursor the previous one is kept. Only a run
//! that reaches the last page marks the checkpoint complete.
//! A hard failure or a body that is not JSON ends the run as `Aborted`
//! without touching the checkpoint, so a resume retries that page.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::api::{self, CommunityInfo};
use crate::backoff::{FetchFailure, FetchStats, Fetcher, Sleeper};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::member::Member;
use crate::progress::{NullObserver, PageProgress, ProgressObserver, RateWindow};
use crate::sink::{load_existing, CsvTable, DedupSink, SinkError, WriteMode};
use crate::transport::Transport;

/// Why a run finished normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneReason {
    /// The source returned no next cursor
    Exhausted,
    /// The member limit was reached
    LimitReached,
    /// The checkpoint already recorded an exhausted collection
    AlreadyComplete,
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// A page contained no members
    EmptyPage,
    /// The request failed without a retryable cause
    FetchFailed(FetchFailure),
    /// The response body could not be decoded
    MalformedPage(String),
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::EmptyPage => write!(f, "received a page without members"),
            AbortReason::FetchFailed(e) => write!(f, "{}", e),
            AbortReason::MalformedPage(e) => write!(f, "{}", e),
        }
    }
}

/// Paginator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Start,
    Fetching { cursor: Option<String> },
    Done(DoneReason),
    Aborted(AbortReason),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done(_) | RunState::Aborted(_))
    }
}

/// Caller settings for one collection run.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub community_id: String,
    /// Stop once this many members were received
    pub limit: Option<u64>,
    /// Cursor to start from when not resuming (or when no checkpoint exists)
    pub start_cursor: Option<String>,
    /// Continue from the saved checkpoint
    pub resume: bool,
    /// Pause between page requests
    pub page_delay: Duration,
    /// Community size used for percentages and ETA
    pub community_size: Option<u64>,
}

impl CollectorOptions {
    pub fn new(community_id: impl Into<String>) -> Self {
        Self {
            community_id: community_id.into(),
            limit: None,
            start_cursor: None,
            resume: false,
            page_delay: Duration::from_secs(1),
            community_size: None,
        }
    }
}

/// Outcome of a collection run.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectReport {
    /// Terminal state
    pub state: RunState,
    /// Members written by this run
    pub collected: u64,
    /// Members present before the run
    pub existing: u64,
    /// Members received that were already known
    pub duplicates: u64,
    /// Pages fetched
    pub pages: u64,
    /// Cursor a resumed run would start from; `None` when exhausted
    pub resume_cursor: Option<String>,
    /// Last checkpoint written by this run
    pub checkpoint: Option<Checkpoint>,
    pub elapsed: Duration,
    pub stats: FetchStats,
}

impl CollectReport {
    pub fn total(&self) -> u64 {
        self.collected + self.existing
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.state, RunState::Aborted(_))
    }

    /// Members written per minute over the whole run.
    pub fn members_per_minute(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            Some(self.collected as f64 / secs * 60.0)
        } else {
            None
        }
    }
}

/// Drives member collection for one community into one member table.
pub struct Collector<T, S, O = NullObserver> {
    fetcher: Fetcher<T, S>,
    output: PathBuf,
    checkpoints: CheckpointStore,
    options: CollectorOptions,
    observer: O,
}

impl<T: Transport, S: Sleeper> Collector<T, S, NullObserver> {
    pub fn new(fetcher: Fetcher<T, S>, output: impl Into<PathBuf>, options: CollectorOptions) -> Self {
        let output = output.into();
        Self {
            fetcher,
            checkpoints: CheckpointStore::for_output(&output),
            output,
            options,
            observer: NullObserver,
        }
    }
}

impl<T: Transport, S: Sleeper, O: ProgressObserver> Collector<T, S, O> {
    /// Report progress to `observer`.
    pub fn with_observer<P: ProgressObserver>(self, observer: P) -> Collector<T, S, P> {
        Collector {
            fetcher: self.fetcher,
            output: self.output,
            checkpoints: self.checkpoints,
            options: self.options,
            observer,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn fetcher(&self) -> &Fetcher<T, S> {
        &self.fetcher
    }

    /// Look up community metadata and remember its member count.
    ///
    /// Failures are logged and yield `None`; collection works without it.
    pub fn fetch_community_info(&mut self) -> Option<CommunityInfo> {
        let request = api::community_info_request(&self.options.community_id);
        let body = match self.fetcher.fetch(&request) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch community info");
                return None;
            }
        };

        match api::parse_community_info(&body) {
            Ok(info) => {
                if info.member_count.is_some() {
                    self.options.community_size = info.member_count;
                }
                Some(info)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not parse community info");
                None
            }
        }
    }

    /// Run the collection to a terminal state.
    ///
    /// Only a failure to read the existing member table is an error.
    /// Remote and write failures end or degrade the run and are reported
    /// through the returned state.
    pub fn run(&mut self) -> Result<CollectReport, SinkError> {
        let started = Instant::now();
        let table: CsvTable<Member> = CsvTable::new(&self.output);
        let (seen, existing) = load_existing(&table)?;
        let existing = existing.len() as u64;
        if existing > 0 {
            tracing::info!(existing, path = %self.output.display(), "Found existing members");
        }
        let mut sink = DedupSink::with_seen(table, WriteMode::Append, seen);

        let mut report = CollectReport {
            state: RunState::Start,
            collected: 0,
            existing,
            duplicates: 0,
            pages: 0,
            resume_cursor: None,
            checkpoint: None,
            elapsed: Duration::ZERO,
            stats: FetchStats::default(),
        };

        report.state = self.start();
        if let RunState::Fetching { cursor } = &report.state {
            report.resume_cursor = cursor.clone();
        }

        let mut window = RateWindow::default();
        let mut received: u64 = 0;

        while let RunState::Fetching { cursor } = &report.state {
            let cursor = cursor.clone();
            if report.pages > 0 {
                self.fetcher.pause(self.options.page_delay);
            }
            let batch_started = Instant::now();
            report.pages += 1;

            let request = api::members_request(&self.options.community_id, cursor.as_deref());
            let body = match self.fetcher.fetch(&request) {
                Ok(body) => body,
                Err(e) => {
                    report.state = RunState::Aborted(AbortReason::FetchFailed(e));
                    break;
                }
            };
            let page = match api::parse_members_page(&body) {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(error = %e, cursor = ?cursor, "Could not decode members page");
                    report.state = RunState::Aborted(AbortReason::MalformedPage(e.to_string()));
                    break;
                }
            };

            let in_page = page.members.len();
            received += in_page as u64;
            let mut saved = 0;
            for member in page.members {
                if sink.push(member) {
                    saved += 1;
                }
            }
            let duplicates = in_page - saved;
            report.duplicates += duplicates as u64;
            if duplicates > 0 {
                tracing::info!(duplicates, "Skipped duplicate members");
            }

            // An empty page without a cursor keeps the last known position
            if in_page > 0 || page.next_cursor.is_some() {
                report.resume_cursor = page.next_cursor.clone();
            }

            report.state = if in_page == 0 {
                RunState::Aborted(AbortReason::EmptyPage)
            } else if page.next_cursor.is_none() {
                RunState::Done(DoneReason::Exhausted)
            } else if self.options.limit.is_some_and(|limit| received >= limit) {
                RunState::Done(DoneReason::LimitReached)
            } else {
                RunState::Fetching {
                    cursor: page.next_cursor,
                }
            };
            self.commit(&mut sink, &mut report);

            window.push(saved as u64, batch_started.elapsed());
            self.report_page(&report, &window, in_page, saved, duplicates, batch_started.elapsed());
        }

        if sink.pending() > 0 {
            self.commit(&mut sink, &mut report);
        }

        report.elapsed = started.elapsed();
        report.stats = self.fetcher.stats();
        match &report.state {
            RunState::Aborted(reason) => {
                tracing::warn!(%reason, collected = report.collected, "Collection aborted")
            }
            state => tracing::info!(?state, collected = report.collected, "Collection finished"),
        }
        Ok(report)
    }

    /// Resolve the starting cursor.
    fn start(&self) -> RunState {
        if !self.options.resume {
            return RunState::Fetching {
                cursor: self.options.start_cursor.clone(),
            };
        }

        match self.checkpoints.load() {
            Some(cp)
                if !cp.community_id.is_empty() && cp.community_id != self.options.community_id =>
            {
                tracing::warn!(
                    saved = %cp.community_id,
                    requested = %self.options.community_id,
                    "Checkpoint belongs to another community, ignoring it"
                );
                RunState::Fetching {
                    cursor: self.options.start_cursor.clone(),
                }
            }
            Some(cp) if cp.is_exhausted() => {
                tracing::info!("Checkpoint shows the collection is complete, nothing to fetch");
                RunState::Done(DoneReason::AlreadyComplete)
            }
            Some(cp) if cp.last_cursor.is_none() => {
                tracing::info!("Checkpoint has no cursor, starting from the beginning");
                RunState::Fetching {
                    cursor: self.options.start_cursor.clone(),
                }
            }
            Some(cp) => {
                tracing::info!(cursor = ?cp.last_cursor, "Continuing from saved cursor");
                RunState::Fetching {
                    cursor: cp.last_cursor,
                }
            }
            None => {
                tracing::info!("No saved cursor found, starting from the beginning");
                RunState::Fetching {
                    cursor: self.options.start_cursor.clone(),
                }
            }
        }
    }

    /// Flush buffered members and advance the checkpoint if they are durable.
    fn commit(&self, sink: &mut DedupSink<CsvTable<Member>>, report: &mut CollectReport) {
        match sink.flush() {
            Ok(written) => report.collected += written as u64,
            Err(e) => {
                tracing::warn!(error = %e, pending = sink.pending(), "Could not write members, retrying with the next page");
                return;
            }
        }

        let mut checkpoint = Checkpoint::new(
            &self.options.community_id,
            report.resume_cursor.clone(),
            report.collected,
            report.existing,
            self.options.community_size,
        );
        if report.state == RunState::Done(DoneReason::Exhausted) {
            checkpoint = checkpoint.completed();
        }
        match self.checkpoints.save(&checkpoint) {
            Ok(()) => report.checkpoint = Some(checkpoint),
            Err(e) => tracing::warn!(error = %e, "Could not save checkpoint"),
        }
    }

    fn report_page(
        &self,
        report: &CollectReport,
        window: &RateWindow,
        in_page: usize,
        saved: usize,
        duplicates: usize,
        batch_duration: Duration,
    ) {
        let total = report.total();
        let remaining = self
            .options
            .community_size
            .map(|size| size.saturating_sub(total));
        self.observer.on_page(&PageProgress {
            page: report.pages,
            members_in_page: in_page,
            saved,
            duplicates,
            collected: report.collected,
            total,
            community_size: self.options.community_size,
            batch_duration,
            rate_per_minute: window.per_minute(),
            remaining,
            eta: remaining.and_then(|r| window.eta(r)),
            throttle_hits: self.fetcher.throttle_hits(),
        });
    }
}
