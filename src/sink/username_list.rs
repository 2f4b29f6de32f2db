//! Plain-text list of usernames, one per line.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{Keyed, OutputStore, SinkError};
use crate::files::write_atomic;

/// A username entry of a [`UsernameList`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(pub String);

impl Keyed for Username {
    fn key(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Username(s.to_string())
    }
}

/// Headerless list of usernames.
///
/// When loading, lines are trimmed, blank lines are ignored, and for
/// spreadsheet exports only the first comma-separated field counts (a
/// leading `username` header row is skipped).
#[derive(Debug, Clone)]
pub struct UsernameList {
    path: PathBuf,
}

impl UsernameList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether the file ends without a newline and the next append needs one.
    fn needs_separator(&self) -> io::Result<bool> {
        let mut file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if file.metadata()?.len() == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }
}

fn render(records: &[Username]) -> String {
    records.iter().map(|u| format!("{}\n", u.0)).collect()
}

impl OutputStore for UsernameList {
    type Record = Username;

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Username>, SinkError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SinkError::io(&self.path, e)),
        };

        Ok(text
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let name = line.split(',').next().unwrap_or_default().trim();
                if name.is_empty() || (index == 0 && name.eq_ignore_ascii_case("username")) {
                    None
                } else {
                    Some(Username::from(name))
                }
            })
            .collect())
    }

    fn append(&self, records: &[Username]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
        }

        let separator = self
            .needs_separator()
            .map_err(|e| SinkError::io(&self.path, e))?;
        let mut text = String::new();
        if separator {
            text.push('\n');
        }
        text.push_str(&render(records));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkError::io(&self.path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| SinkError::io(&self.path, e))
    }

    fn overwrite(&self, records: &[Username]) -> Result<(), SinkError> {
        write_atomic(&self.path, render(records).as_bytes())
            .map_err(|e| SinkError::io(&self.path, e))
    }
}
