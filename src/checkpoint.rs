//! Durable pagination checkpoint.
//!
//! The checkpoint is a JSON sidecar (`{stem}_metadata.json`) next to the
//! member table. It is overwritten after every committed page and is the
//! only resume point a run has. A missing or unreadable file means a cold
//! start.
//!
//! `last_cursor` must be present in the file. An explicit `null` means no
//! position is known and a resumed run starts from the first page. Only
//! `complete: true`, written when the source ran out of pages, marks the
//! collection as finished.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::files::{metadata_path_for, write_atomic};

/// Errors raised while persisting a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to write checkpoint {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode checkpoint: {0}")]
    Json(#[from] serde_json::Error),
}

/// Progress record persisted after each page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Cursor of the next page to fetch; `None` restarts from the first page
    #[serde(deserialize_with = "Option::deserialize")]
    pub last_cursor: Option<String>,
    /// Set once the last page was fetched
    #[serde(default)]
    pub complete: bool,
    /// Members written by the run that saved this checkpoint
    #[serde(default, alias = "collected_members")]
    pub collected_count: u64,
    /// Members already present before that run started
    #[serde(default, alias = "existing_members")]
    pub existing_count: u64,
    #[serde(default, alias = "total_collected")]
    pub total_count: u64,
    /// Member count reported by the community, when known
    #[serde(default, alias = "total_members")]
    pub community_size: Option<u64>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub community_id: String,
    /// RFC 3339 timestamp of the save
    #[serde(default)]
    pub last_updated: String,
}

impl Checkpoint {
    /// Build a checkpoint stamped with the current time.
    pub fn new(
        community_id: &str,
        last_cursor: Option<String>,
        collected_count: u64,
        existing_count: u64,
        community_size: Option<u64>,
    ) -> Self {
        let total_count = collected_count + existing_count;
        Self {
            last_cursor,
            complete: false,
            collected_count,
            existing_count,
            total_count,
            community_size,
            progress_percentage: progress_percentage(total_count, community_size),
            community_id: community_id.to_string(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Mark the collection as finished.
    pub fn completed(mut self) -> Self {
        self.complete = true;
        self
    }

    /// Whether the collection this checkpoint describes has no pages left.
    pub fn is_exhausted(&self) -> bool {
        self.complete
    }
}

/// Share of the community collected so far, rounded to two decimals and
/// capped at 100.
pub fn progress_percentage(total: u64, community_size: Option<u64>) -> Option<f64> {
    match community_size {
        Some(size) if size > 0 => {
            let pct = (total as f64 / size as f64 * 100.0).min(100.0);
            Some((pct * 100.0).round() / 100.0)
        }
        _ => None,
    }
}

/// Reads and writes the checkpoint file of one output.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the sidecar of a member table.
    pub fn for_output(output: &Path) -> Self {
        Self::new(metadata_path_for(output))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint. Missing or corrupt files yield `None`.
    pub fn load(&self) -> Option<Checkpoint> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Cannot read checkpoint, starting fresh");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt checkpoint");
                None
            }
        }
    }

    /// Overwrite the checkpoint atomically.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        write_atomic(&self.path, json.as_bytes()).map_err(|source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            path = %self.path.display(),
            cursor = ?checkpoint.last_cursor,
            collected = checkpoint.collected_count,
            "Checkpoint saved"
        );
        Ok(())
    }
}
