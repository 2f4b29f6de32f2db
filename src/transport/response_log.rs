//! Write-only log of raw API responses.
//!
//! Every HTTP response body is dropped into its own file so an operator can
//! inspect what the API actually returned. Writing is best-effort: failures
//! are reported at debug level and never reach the caller.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory of timestamped response dumps.
#[derive(Debug, Clone)]
pub struct ResponseLog {
    dir: PathBuf,
}

impl ResponseLog {
    /// Create a log rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the log writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path a response with `label` would be written to right now.
    pub fn path_for(&self, label: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
        self.dir.join(format!("{}_{}.json", sanitize(label), stamp))
    }

    /// Record a response body. Returns the written path on success.
    pub fn record(&self, label: &str, body: &str) -> Option<PathBuf> {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::debug!(dir = %self.dir.display(), error = %e, "Cannot create response log directory");
            return None;
        }

        let path = self.path_for(label);
        match fs::write(&path, body) {
            Ok(()) => {
                tracing::trace!(path = %path.display(), "Response logged");
                Some(path)
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Failed to write response log");
                None
            }
        }
    }
}

/// Keep labels safe for use as file names.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
