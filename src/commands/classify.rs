//! Classify command handler

use anyhow::{Context, Result};
use std::path::Path;

use cscout::backoff::{Fetcher, ThreadSleeper};
use cscout::classifier::{load_accounts, ClassifyOptions, ClassifyReport, Classifier, OutputLayout};
use cscout::cli::ClassifyArgs;
use cscout::progress::format_duration;
use cscout::transport::Credentials;
use cscout::Config;

use super::{exit_on_interrupt, http_transport, progress_reporter, quoted};

/// Classify the accounts of a member table against a target.
#[cfg(not(tarpaulin_include))]
pub fn handle(
    args: ClassifyArgs,
    credentials: Credentials,
    config: &Config,
    quiet: bool,
) -> Result<()> {
    let input = args.input.clone().unwrap_or_else(|| config.members_file());
    let accounts = load_accounts(&input)?;
    println!("Loaded {} accounts from {}", accounts.len(), input.display());

    let layout = OutputLayout::derive(&input, &args.target, args.output.as_deref(), args.separate);

    let transport = http_transport(config, credentials)?;
    let fetcher = Fetcher::new(
        transport,
        ThreadSleeper,
        config.backoff.classification_policy(),
    );

    let mut options = ClassifyOptions::new(&args.target);
    options.limit = args.limit;
    options.resume = args.resume;
    options.account_delay = config.pacing.account_delay();
    options.flush_every = config.pacing.flush_every;

    exit_on_interrupt(resume_hint(&args.target, &input, &args));

    let report = Classifier::new(fetcher, layout, options)
        .with_observer(progress_reporter(quiet))
        .run(&accounts)
        .context("Cannot read earlier classification results")?;

    println!("{}", summary(&report, &args.target));
    Ok(())
}

/// Command line that continues this classification.
pub fn resume_hint(target: &str, input: &Path, args: &ClassifyArgs) -> String {
    let mut hint = format!(
        "Resume with: cscout classify --target {} --input {}",
        target,
        quoted(input)
    );
    if args.separate {
        hint.push_str(" --separate");
    } else if let Some(output) = &args.output {
        hint.push_str(&format!(" --output {}", quoted(output)));
    }
    hint.push_str(" --continue");
    hint
}

/// End-of-run summary.
pub fn summary(report: &ClassifyReport, target: &str) -> String {
    let counts = &report.counts;
    let mut lines = vec![format!(
        "Checked {} accounts against @{} in {}",
        counts.total(),
        target.trim_start_matches('@'),
        format_duration(report.elapsed)
    )];
    if report.skipped > 0 {
        lines.push(format!("Skipped {} accounts from an earlier run", report.skipped));
    }
    lines.push(format!(
        "Following: {} | Not following: {} | Unknown: {} | Protected: {}",
        counts.following, counts.not_following, counts.unknown, counts.protected
    ));
    lines.push(format!(
        "Totals including earlier runs: {} following, {} not following",
        report.following_total, report.not_following_total
    ));
    if report.stats.throttle_hits > 0 {
        lines.push(format!("Rate limited {} times", report.stats.throttle_hits));
    }
    for path in report.layout.paths() {
        lines.push(format!("Results: {}", path.display()));
    }
    lines.join("\n")
}
