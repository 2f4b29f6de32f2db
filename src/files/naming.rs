//! Derived file names.
//!
//! Every name here sits next to the file it is derived from:
//!
//! - checkpoint: `{stem}_metadata.json` beside the member table
//! - combined classification: `{stem}_follows_{target}.csv` beside the input
//! - split classification: `{stem}_following_{target}.csv` and
//!   `{stem}_not_following_{target}.csv`

use std::path::{Path, PathBuf};

/// Characters that are invalid in filenames on common filesystems.
const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// `path` with its extension removed, keeping the directory.
fn stem_base(path: &Path) -> PathBuf {
    path.with_extension("")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = stem_base(path).into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Checkpoint sidecar for a member table.
pub fn metadata_path_for(output: &Path) -> PathBuf {
    with_suffix(output, "_metadata.json")
}

/// Make a target handle safe for use inside a file name.
pub fn target_component(target: &str) -> String {
    target
        .trim()
        .trim_start_matches('@')
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Default output locations for classifying `input` against `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationPaths {
    pub combined: PathBuf,
    pub following: PathBuf,
    pub not_following: PathBuf,
}

pub fn classification_outputs(input: &Path, target: &str) -> ClassificationPaths {
    let target = target_component(target);
    ClassificationPaths {
        combined: with_suffix(input, &format!("_follows_{}.csv", target)),
        following: with_suffix(input, &format!("_following_{}.csv", target)),
        not_following: with_suffix(input, &format!("_not_following_{}.csv", target)),
    }
}
