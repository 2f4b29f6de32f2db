//! Community Scout (cscout) - CLI entry point

mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cscout::cli::{Cli, Commands, ConfigCommands, Verbosity};
use cscout::Config;

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(verbosity: Verbosity) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::new(verbosity.directive()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

#[cfg(not(tarpaulin_include))]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbosity)?;
    let quiet = cli.verbosity.quiet;

    match cli.command {
        Commands::Collect(args) => {
            let credentials = commands::credentials(&cli.credentials)?;
            let config = Config::load()?;
            commands::collect::handle(args, credentials, &config, quiet)
        }
        Commands::Classify(args) => {
            let credentials = commands::credentials(&cli.credentials)?;
            let config = Config::load()?;
            commands::classify::handle(args, credentials, &config, quiet)
        }
        Commands::Status { output } => {
            let config = Config::load()?;
            commands::status::handle(output.as_deref(), &config)
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::handle_show(),
            ConfigCommands::Path => commands::config::handle_path(),
        },
        Commands::Completions { shell } => commands::completions::handle::<Cli>(shell),
    }
}
