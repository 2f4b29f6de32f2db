//! Config subcommands handler

use anyhow::{Context, Result};

use cscout::Config;

/// Show the effective configuration as TOML.
#[cfg(not(tarpaulin_include))]
pub fn handle_show() -> Result<()> {
    let config = Config::load()?;
    print!("{}", render(&config)?);
    Ok(())
}

/// Print the config file location.
#[cfg(not(tarpaulin_include))]
pub fn handle_path() -> Result<()> {
    let path = Config::config_path()?;
    let note = if path.exists() { "" } else { " (not created, defaults in use)" };
    println!("{}{}", path.display(), note);
    Ok(())
}

/// TOML text of `config`.
pub fn render(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}
