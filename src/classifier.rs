//! Follow classification of a member list against a target account.
//!
//! Accounts are checked one at a time, in input order:
//!
//! 1. the target itself is `Self` (no request)
//! 2. protected accounts are `ProtectedUnknown` (no request)
//! 3. accounts without an id are `Unknown` (no request)
//! 4. otherwise the first page of the account's follows is fetched and
//!    scanned for the target: found is `Following`, not found is
//!    `NotFollowing`, a failed request or undecodable body is `Unknown`
//!
//! Only the first page (100 edges) is scanned, so an account that follows
//! the target further down its list is reported as `NotFollowing`.
//!
//! Results go into two buckets (following: `Following` and `Self`,
//! everything else not following), persisted either as one combined table
//! or as two username lists.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::api;
use crate::backoff::{FetchStats, Fetcher, Sleeper};
use crate::files::classification_outputs;
use crate::member::{lenient_bool, normalize_username};
use crate::progress::{AccountProgress, NullObserver, ProgressObserver, RateWindow};
use crate::sink::{
    load_existing, CsvTable, DedupSink, Keyed, SinkError, Username, UsernameList, WriteMode,
};
use crate::transport::Transport;

/// Classification result for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(alias = "Yes")]
    Following,
    #[serde(alias = "No")]
    NotFollowing,
    Unknown,
    /// The checked account is the target
    #[serde(rename = "Self")]
    SelfAccount,
    #[serde(alias = "Unknown (Protected)")]
    ProtectedUnknown,
}

impl Outcome {
    /// Short human label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Following => "following",
            Outcome::NotFollowing => "not following",
            Outcome::Unknown => "unknown",
            Outcome::SelfAccount => "self",
            Outcome::ProtectedUnknown => "protected",
        }
    }

    /// Whether the outcome lands in the following bucket.
    pub fn is_following_bucket(&self) -> bool {
        matches!(self, Outcome::Following | Outcome::SelfAccount)
    }
}

/// One row of the combined classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub username: String,
    #[serde(alias = "follows_target")]
    pub outcome: Outcome,
}

impl Keyed for ClassificationRecord {
    fn key(&self) -> &str {
        &self.username
    }
}

/// An account to classify, read from a member table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputAccount {
    pub id: Option<String>,
    pub username: String,
    #[serde(deserialize_with = "lenient_bool")]
    pub protected: bool,
}

/// Errors raised while reading the classification input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input file not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot read input {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Read the accounts of a member table, skipping rows without a username.
pub fn load_accounts(path: &Path) -> Result<Vec<InputAccount>, InputError> {
    if !path.is_file() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut accounts = Vec::new();
    for (index, row) in reader.deserialize::<InputAccount>().enumerate() {
        match row {
            Ok(mut account) => {
                account.username = account.username.trim().to_string();
                if account.username.is_empty() {
                    tracing::warn!(row = index + 1, "Skipping input row without username");
                    continue;
                }
                account.id = account.id.filter(|id| !id.trim().is_empty());
                accounts.push(account);
            }
            Err(e) => tracing::warn!(row = index + 1, error = %e, "Skipping unreadable input row"),
        }
    }
    Ok(accounts)
}

/// Where classification results are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// One `username,outcome` table
    Combined { path: PathBuf },
    /// Two headerless username lists
    Split {
        following: PathBuf,
        not_following: PathBuf,
    },
}

impl OutputLayout {
    /// Default layout for `input` and `target`; `output` overrides the
    /// combined table path.
    pub fn derive(input: &Path, target: &str, output: Option<&Path>, separate: bool) -> Self {
        let paths = classification_outputs(input, target);
        if separate {
            OutputLayout::Split {
                following: paths.following,
                not_following: paths.not_following,
            }
        } else {
            OutputLayout::Combined {
                path: output.map(Path::to_path_buf).unwrap_or(paths.combined),
            }
        }
    }

    pub fn paths(&self) -> Vec<&Path> {
        match self {
            OutputLayout::Combined { path } => vec![path.as_path()],
            OutputLayout::Split {
                following,
                not_following,
            } => vec![following.as_path(), not_following.as_path()],
        }
    }
}

/// Caller settings for one classification run.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub target: String,
    /// Only the first `limit` input accounts are considered
    pub limit: Option<usize>,
    /// Keep earlier results and skip accounts already classified
    pub resume: bool,
    /// Pause after each remote check
    pub account_delay: Duration,
    /// Flush outputs after this many accounts
    pub flush_every: usize,
}

impl ClassifyOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            limit: None,
            resume: false,
            account_delay: Duration::from_secs(2),
            flush_every: 5,
        }
    }
}

/// Per-outcome tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub following: usize,
    pub not_following: usize,
    pub unknown: usize,
    pub self_account: usize,
    pub protected: usize,
}

impl OutcomeCounts {
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Following => self.following += 1,
            Outcome::NotFollowing => self.not_following += 1,
            Outcome::Unknown => self.unknown += 1,
            Outcome::SelfAccount => self.self_account += 1,
            Outcome::ProtectedUnknown => self.protected += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.following + self.not_following + self.unknown + self.self_account + self.protected
    }

    /// Size of the following bucket.
    pub fn following_bucket(&self) -> usize {
        self.following + self.self_account
    }

    /// Size of the not-following-or-unknown bucket.
    pub fn not_following_bucket(&self) -> usize {
        self.total() - self.following_bucket()
    }
}

/// Outcome of a classification run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyReport {
    pub layout: OutputLayout,
    /// Outcomes produced by this run
    pub counts: OutcomeCounts,
    /// Accounts skipped because an earlier run classified them
    pub skipped: usize,
    /// Following bucket size including earlier runs
    pub following_total: usize,
    /// Not-following bucket size including earlier runs
    pub not_following_total: usize,
    pub elapsed: Duration,
    pub stats: FetchStats,
}

/// Persistence for the two result buckets.
enum Outputs {
    Combined(DedupSink<CsvTable<ClassificationRecord>>),
    Split {
        following: DedupSink<UsernameList>,
        not_following: DedupSink<UsernameList>,
    },
}

impl Outputs {
    /// Open the outputs. Returns the earlier bucket sizes when resuming.
    fn open(layout: &OutputLayout, resume: bool) -> Result<(Self, usize, usize), SinkError> {
        let mode = if resume {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        };

        match layout {
            OutputLayout::Combined { path } => {
                let table: CsvTable<ClassificationRecord> = CsvTable::new(path);
                if !resume {
                    return Ok((Outputs::Combined(DedupSink::new(table, mode)), 0, 0));
                }
                let (seen, records) = load_existing(&table)?;
                let following = records
                    .iter()
                    .filter(|r| r.outcome.is_following_bucket())
                    .count();
                let not_following = records.len() - following;
                Ok((
                    Outputs::Combined(DedupSink::with_seen(table, mode, seen)),
                    following,
                    not_following,
                ))
            }
            OutputLayout::Split {
                following,
                not_following,
            } => {
                let following = UsernameList::new(following);
                let not_following = UsernameList::new(not_following);
                if !resume {
                    return Ok((
                        Outputs::Split {
                            following: DedupSink::new(following, mode),
                            not_following: DedupSink::new(not_following, mode),
                        },
                        0,
                        0,
                    ));
                }
                let (seen_following, prior_following) = load_existing(&following)?;
                let (seen_not, prior_not) = load_existing(&not_following)?;
                Ok((
                    Outputs::Split {
                        following: DedupSink::with_seen(following, mode, seen_following),
                        not_following: DedupSink::with_seen(not_following, mode, seen_not),
                    },
                    prior_following.len(),
                    prior_not.len(),
                ))
            }
        }
    }

    fn contains(&self, username: &str) -> bool {
        match self {
            Outputs::Combined(sink) => sink.contains(username),
            Outputs::Split {
                following,
                not_following,
            } => following.contains(username) || not_following.contains(username),
        }
    }

    fn push(&mut self, username: &str, outcome: Outcome) {
        match self {
            Outputs::Combined(sink) => {
                sink.push(ClassificationRecord {
                    username: username.to_string(),
                    outcome,
                });
            }
            Outputs::Split {
                following,
                not_following,
            } => {
                let bucket = if outcome.is_following_bucket() {
                    following
                } else {
                    not_following
                };
                bucket.push(Username(username.to_string()));
            }
        }
    }

    fn flush(&mut self) {
        let results = match self {
            Outputs::Combined(sink) => vec![sink.flush()],
            Outputs::Split {
                following,
                not_following,
            } => vec![following.flush(), not_following.flush()],
        };
        for result in results {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Could not write classification results, retrying at next flush");
            }
        }
    }
}

/// Classifies accounts against one target.
pub struct Classifier<T, S, O = NullObserver> {
    fetcher: Fetcher<T, S>,
    layout: OutputLayout,
    options: ClassifyOptions,
    target: String,
    observer: O,
}

impl<T: Transport, S: Sleeper> Classifier<T, S, NullObserver> {
    pub fn new(fetcher: Fetcher<T, S>, layout: OutputLayout, options: ClassifyOptions) -> Self {
        Self {
            fetcher,
            layout,
            target: normalize_username(&options.target),
            options,
            observer: NullObserver,
        }
    }
}

impl<T: Transport, S: Sleeper, O: ProgressObserver> Classifier<T, S, O> {
    /// Report progress to `observer`.
    pub fn with_observer<P: ProgressObserver>(self, observer: P) -> Classifier<T, S, P> {
        Classifier {
            fetcher: self.fetcher,
            layout: self.layout,
            options: self.options,
            target: self.target,
            observer,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn fetcher(&self) -> &Fetcher<T, S> {
        &self.fetcher
    }

    /// Classify one account, querying the remote side when needed.
    pub fn classify_account(&mut self, account: &InputAccount) -> Outcome {
        self.evaluate(account).0
    }

    /// Outcome plus whether a remote request was made.
    fn evaluate(&mut self, account: &InputAccount) -> (Outcome, bool) {
        if normalize_username(&account.username) == self.target {
            return (Outcome::SelfAccount, false);
        }
        if account.protected {
            return (Outcome::ProtectedUnknown, false);
        }
        let Some(id) = account.id.as_deref().filter(|id| !id.is_empty()) else {
            tracing::warn!(username = %account.username, "Missing user id, cannot check follows");
            return (Outcome::Unknown, false);
        };

        let body = match self.fetcher.fetch(&api::following_request(id)) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(username = %account.username, error = %e, "Follow check failed");
                return (Outcome::Unknown, true);
            }
        };

        let outcome = match api::follows_target(&body, &self.target) {
            Ok(true) => Outcome::Following,
            Ok(false) => Outcome::NotFollowing,
            Err(e) => {
                tracing::warn!(username = %account.username, error = %e, "Could not decode follow list");
                Outcome::Unknown
            }
        };
        (outcome, true)
    }

    /// Classify `accounts` and persist the results.
    ///
    /// Only a failure to read earlier results is an error.
    pub fn run(&mut self, accounts: &[InputAccount]) -> Result<ClassifyReport, SinkError> {
        let started = Instant::now();
        let (mut outputs, prior_following, prior_not) =
            Outputs::open(&self.layout, self.options.resume)?;

        let considered: Vec<&InputAccount> = match self.options.limit {
            Some(limit) => accounts.iter().take(limit).collect(),
            None => accounts.iter().collect(),
        };
        let work: Vec<&InputAccount> = considered
            .iter()
            .copied()
            .filter(|a| !outputs.contains(&a.username))
            .collect();
        let skipped = considered.len() - work.len();
        if skipped > 0 {
            tracing::info!(skipped, "Skipping accounts classified by an earlier run");
        }

        let total = work.len();
        let flush_every = self.options.flush_every.max(1);
        let mut counts = OutcomeCounts::default();
        let mut since_flush = 0;
        let mut window = RateWindow::default();

        for (index, account) in work.iter().enumerate() {
            if outputs.contains(&account.username) {
                tracing::debug!(username = %account.username, "Duplicate input account");
                continue;
            }
            let account_started = Instant::now();
            let (outcome, remote) = self.evaluate(account);
            outputs.push(&account.username, outcome);
            counts.add(outcome);

            since_flush += 1;
            if since_flush >= flush_every {
                outputs.flush();
                since_flush = 0;
            }

            let is_last = index + 1 == total;
            if remote && !is_last {
                self.fetcher.pause(self.options.account_delay);
            }
            window.push(1, account_started.elapsed());

            self.observer.on_account(&AccountProgress {
                index: index + 1,
                total,
                username: account.username.clone(),
                outcome,
                following: prior_following + counts.following_bucket(),
                not_following: prior_not + counts.not_following_bucket(),
                rate_per_minute: window.per_minute(),
                eta: window.eta((total - index - 1) as u64),
                throttle_hits: self.fetcher.throttle_hits(),
            });
        }

        outputs.flush();

        let report = ClassifyReport {
            layout: self.layout.clone(),
            counts,
            skipped,
            following_total: prior_following + counts.following_bucket(),
            not_following_total: prior_not + counts.not_following_bucket(),
            elapsed: started.elapsed(),
            stats: self.fetcher.stats(),
        };
        tracing::info!(
            processed = counts.total(),
            following = report.following_total,
            not_following = report.not_following_total,
            "Classification finished"
        );
        Ok(report)
    }
}
