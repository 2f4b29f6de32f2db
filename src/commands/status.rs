//! Status command handler

use anyhow::Result;
use std::path::Path;

use cscout::checkpoint::{Checkpoint, CheckpointStore};
use cscout::Config;

/// Print the checkpoint of a member table.
#[cfg(not(tarpaulin_include))]
pub fn handle(output: Option<&Path>, config: &Config) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.members_file());
    let store = CheckpointStore::for_output(&output);
    match store.load() {
        Some(checkpoint) => println!("{}", describe(&checkpoint)),
        None => println!(
            "No checkpoint for {} (looked for {})",
            output.display(),
            store.path().display()
        ),
    }
    Ok(())
}

/// Human-readable checkpoint summary.
pub fn describe(cp: &Checkpoint) -> String {
    let mut lines = Vec::new();
    if !cp.community_id.is_empty() {
        lines.push(format!("Community:   {}", cp.community_id));
    }
    lines.push(match &cp.last_cursor {
        _ if cp.is_exhausted() => "Next cursor: none (collection complete)".to_string(),
        Some(cursor) => format!("Next cursor: {}", cursor),
        None => "Next cursor: none (next run starts from the first page)".to_string(),
    });
    let mut members = format!(
        "Members:     {} total ({} last run, {} before)",
        cp.total_count, cp.collected_count, cp.existing_count
    );
    if let Some(size) = cp.community_size {
        members.push_str(&format!(" of {}", size));
    }
    if let Some(pct) = cp.progress_percentage {
        members.push_str(&format!(" [{:.2}%]", pct));
    }
    lines.push(members);
    if !cp.last_updated.is_empty() {
        lines.push(format!("Updated:     {}", cp.last_updated));
    }
    lines.join("\n")
}
