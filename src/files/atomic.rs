//! Atomic file replacement.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Temp file used while replacing `path`.
///
/// The temp path is `path` with `.tmp` appended, so it lives in the same
/// directory and the final rename never crosses filesystems.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}

/// Replace `path` with `contents` using the temp+rename pattern.
///
/// Readers see either the old or the new file, never a partial one. The
/// parent directory is created when missing.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, contents)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}
