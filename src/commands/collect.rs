//! Collect command handler

use anyhow::{Context, Result};
use std::path::Path;

use cscout::backoff::{Fetcher, ThreadSleeper};
use cscout::cli::CollectArgs;
use cscout::collector::{CollectReport, Collector, CollectorOptions, DoneReason, RunState};
use cscout::progress::format_duration;
use cscout::transport::Credentials;
use cscout::Config;

use super::{exit_on_interrupt, http_transport, progress_reporter, quoted};

/// Collect community members into the member table.
///
/// Only startup problems are errors. A run that stops early still exits 0
/// and prints how to resume.
#[cfg(not(tarpaulin_include))]
pub fn handle(
    args: CollectArgs,
    credentials: Credentials,
    config: &Config,
    quiet: bool,
) -> Result<()> {
    let community_id = args
        .community_id
        .filter(|id| !id.trim().is_empty())
        .context("Missing community id: pass --community-id or set TWITTER_COMMUNITY_ID")?;
    let output = args.output.unwrap_or_else(|| config.members_file());

    let transport = http_transport(config, credentials)?;
    let fetcher = Fetcher::new(transport, ThreadSleeper, config.backoff.collection_policy());

    let mut options = CollectorOptions::new(&community_id);
    options.limit = args.limit;
    options.start_cursor = args.cursor;
    options.resume = args.resume;
    options.page_delay = config.pacing.page_delay();

    let mut collector = Collector::new(fetcher, &output, options);
    if !args.skip_info {
        if let Some(info) = collector.fetch_community_info() {
            println!(
                "Community: {} ({} members)",
                info.name.as_deref().unwrap_or("<unnamed>"),
                info.member_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string())
            );
        }
    }

    exit_on_interrupt(resume_hint(&community_id, &output));
    println!("Collecting into {}", output.display());

    let report = collector
        .with_observer(progress_reporter(quiet))
        .run()
        .with_context(|| format!("Cannot read existing members from {}", output.display()))?;

    println!("{}", summary(&report, &community_id, &output));
    Ok(())
}

/// Command line that continues this collection.
pub fn resume_hint(community_id: &str, output: &Path) -> String {
    format!(
        "Resume with: cscout collect --community-id {} --output {} --continue",
        community_id,
        quoted(output)
    )
}

/// End-of-run summary.
pub fn summary(report: &CollectReport, community_id: &str, output: &Path) -> String {
    let mut lines = vec![format!(
        "Collected {} new members ({} existing, {} total) in {}",
        report.collected,
        report.existing,
        report.total(),
        format_duration(report.elapsed)
    )];
    if let Some(rate) = report.members_per_minute() {
        lines.push(format!("Average rate: {:.1} members/min", rate));
    }
    if report.duplicates > 0 {
        lines.push(format!("Skipped {} duplicates", report.duplicates));
    }
    if report.stats.throttle_hits > 0 {
        lines.push(format!("Rate limited {} times", report.stats.throttle_hits));
    }

    match &report.state {
        RunState::Done(DoneReason::Exhausted) => lines.push("All members collected.".to_string()),
        RunState::Done(DoneReason::AlreadyComplete) => {
            lines.push("Checkpoint shows the collection is already complete.".to_string())
        }
        RunState::Done(DoneReason::LimitReached) => {
            lines.push("Member limit reached.".to_string());
            lines.push(resume_hint(community_id, output));
        }
        RunState::Aborted(reason) => {
            lines.push(format!("Stopped early: {}", reason));
            lines.push(resume_hint(community_id, output));
        }
        RunState::Start | RunState::Fetching { .. } => {}
    }
    if let Some(cursor) = &report.resume_cursor {
        lines.push(format!("Last cursor: {}", cursor));
    }
    lines.join("\n")
}
