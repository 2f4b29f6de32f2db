//! Configuration management for cscout
//!
//! Settings come from `~/.config/cscout/config.toml`; every field has a
//! default, so a missing file is fine. Credentials are never stored here.

mod io;
mod types;

pub use types::*;

use anyhow::Result;
use std::path::{Path, PathBuf};

impl Config {
    /// Get the config file path (~/.config/cscout/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        io::config_path()
    }

    /// Get the config directory path (~/.config/cscout)
    pub fn config_dir() -> Result<PathBuf> {
        io::config_dir()
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        io::load()
    }

    /// Load configuration from `path`, or return defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        io::load_from(path)
    }

    /// Member table path with a leading `~/` expanded.
    pub fn members_file(&self) -> PathBuf {
        expand_home(&self.output.members_file)
    }

    /// Response log directory with a leading `~/` expanded.
    pub fn logs_dir(&self) -> PathBuf {
        expand_home(&self.output.logs_dir)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
