//! Community Scout (cscout) Library
//!
//! Resumable, checkpointed, rate-limited collection of community members
//! and classification of their follow status against a target account.

pub mod api;
pub mod backoff;
pub mod checkpoint;
pub mod classifier;
pub mod cli;
pub mod collector;
pub mod config;
pub mod files;
pub mod member;
pub mod progress;
pub mod sink;
pub mod transport;

pub use backoff::{BackoffPolicy, Fetcher, Sleeper};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use classifier::{Classifier, ClassifyOptions, Outcome, OutputLayout};
pub use collector::{Collector, CollectorOptions, RunState};
pub use config::Config;
pub use member::Member;
pub use transport::{PageResult, Transport};
