//! Command handlers for the cscout CLI.
//!
//! Each submodule handles a specific CLI command or command group.
//! The main dispatch logic remains in main.rs.

pub mod classify;
pub mod collect;
pub mod completions;
pub mod config;
pub mod status;

use anyhow::{Context, Result};
use std::path::PathBuf;

use cscout::cli::CredentialArgs;
use cscout::progress::StderrReporter;
use cscout::transport::{Credentials, HttpTransport, ResponseLog};
use cscout::Config;

/// Environment override for the response log directory.
pub const LOGS_DIR_ENV: &str = "TWITTER_LOGS_DIR";

/// Validate the credential flags; any missing value is a startup error.
pub fn credentials(args: &CredentialArgs) -> Result<Credentials> {
    Credentials::new(
        args.bearer_token.clone(),
        args.auth_token.clone(),
        args.csrf_token.clone(),
    )
    .context("Cannot authenticate")
}

/// Directory for raw response dumps, `None` when disabled.
pub fn response_log_dir(config: &Config) -> Option<PathBuf> {
    if !config.output.log_responses {
        return None;
    }
    match std::env::var(LOGS_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => Some(PathBuf::from(dir)),
        _ => Some(config.logs_dir()),
    }
}

/// HTTP transport configured from `config`.
pub fn http_transport(config: &Config, credentials: Credentials) -> Result<HttpTransport> {
    let transport = HttpTransport::new(
        &config.api.base_url,
        credentials,
        config.api.timeout(),
        &config.api.user_agent,
    )
    .context("Failed to build HTTP client")?;

    Ok(match response_log_dir(config) {
        Some(dir) => {
            tracing::debug!(dir = %dir.display(), "Logging raw responses");
            transport.with_response_log(ResponseLog::new(dir))
        }
        None => transport,
    })
}

/// Progress renderer; silent when quiet or when stderr is not a terminal.
pub fn progress_reporter(quiet: bool) -> StderrReporter {
    if quiet || !atty::is(atty::Stream::Stderr) {
        StderrReporter::quiet()
    } else {
        StderrReporter::new()
    }
}

/// Print `hint` and exit with 130 on Ctrl-C.
///
/// Durable state is whatever the last flush wrote.
#[cfg(not(tarpaulin_include))]
pub fn exit_on_interrupt(hint: String) {
    let result = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Interrupted. {}", hint);
        std::process::exit(130);
    });
    if let Err(e) = result {
        tracing::debug!(error = %e, "Interrupt handler not installed");
    }
}

/// Shell-quote a path for a copy-pasteable hint.
pub fn quoted(path: &std::path::Path) -> String {
    let text = path.display().to_string();
    if text.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", text.replace('\'', "'\\''"))
    } else {
        text
    }
}
