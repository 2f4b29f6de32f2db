//! CLI definitions for cscout
//!
//! This module contains the clap CLI structure definitions, separated from main.rs
//! so they can be accessed by xtask for documentation generation (man pages).

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use std::path::PathBuf;

/// Build clap styles for the help output.
///
/// - Green: headers, usage, command names
/// - White: placeholders and valid values
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default())
        .valid(AnsiColor::White.on_default())
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

/// Version string; dev builds carry the git commit.
#[cfg(not(feature = "release"))]
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "-dev (",
    env!("VERGEN_GIT_SHA"),
    ")"
);

/// Version string of official builds.
#[cfg(feature = "release")]
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "cscout")]
#[command(about = "[ Community Scout ] - collect community members and check who follows whom")]
#[command(
    long_about = "Community Scout (cscout) - resumable community member collection.

cscout pages through the member list of a community into a CSV table,
checkpointing after every page so an interrupted run continues where it
stopped. The collected table can then be classified against a target
account: who follows it, who does not, and who could not be checked.

QUICK START:
    cscout collect --community-id 1234567890     Collect all members
    cscout collect --continue                    Resume an interrupted run
    cscout classify --target someone             Who follows @someone
    cscout status                                Show checkpoint progress

CREDENTIALS:
    The session credentials come from flags or environment variables:
    TWITTER_BEARER_TOKEN, TWITTER_AUTH_TOKEN, TWITTER_CSRF_TOKEN"
)]
#[command(version = VERSION)]
#[command(styles = build_cli_styles())]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log level flags
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct Verbosity {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Only warnings and errors, no progress lines
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Verbosity {
    /// Default `tracing` directive for these flags.
    pub fn directive(&self) -> &'static str {
        if self.quiet {
            return "cscout=warn";
        }
        match self.verbose {
            0 => "cscout=info",
            1 => "cscout=debug",
            _ => "cscout=trace",
        }
    }
}

/// Session credentials
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Public bearer token of the web client
    #[arg(long, global = true, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,
    /// `auth_token` session cookie
    #[arg(long, global = true, env = "TWITTER_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
    /// `ct0` CSRF token
    #[arg(long, global = true, env = "TWITTER_CSRF_TOKEN", hide_env_values = true)]
    pub csrf_token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect the members of a community into a CSV table
    #[command(long_about = "Collect the members of a community into a CSV table.

Members are appended to the output table page by page. Members already in
the table are skipped, so re-running never duplicates rows. After every
page a checkpoint ({output}_metadata.json) records the next cursor.

EXAMPLES:
    cscout collect --community-id 1234567890
    cscout collect --community-id 1234567890 --limit 500
    cscout collect --continue                  Resume from the checkpoint
    cscout collect --cursor DAACCgAB...        Start from a known cursor")]
    Collect(CollectArgs),

    /// Classify collected members by whether they follow a target account
    #[command(long_about = "Classify collected members by whether they follow a target.

Each account of the input table is checked against the first page (100
accounts) of its follow list. Outcomes: Following, NotFollowing, Unknown,
Self (the target itself) and ProtectedUnknown (protected accounts).

Results are written to {input}_follows_{target}.csv, or with --separate to
{input}_following_{target}.csv and {input}_not_following_{target}.csv.

EXAMPLES:
    cscout classify --target someone
    cscout classify --target someone --separate
    cscout classify --target someone --continue   Skip accounts already done")]
    Classify(ClassifyArgs),

    /// Show the checkpoint of a member table
    #[command(long_about = "Show the saved checkpoint of a member table.

Prints the next cursor, member counts, progress and the time of the last
save.

EXAMPLE:
    cscout status
    cscout status --output my_members.csv")]
    Status {
        /// Member table whose checkpoint to show
        #[arg(long, short, env = "TWITTER_OUTPUT_FILE")]
        output: Option<PathBuf>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    #[command(long_about = "Generate a shell completion script.

EXAMPLES:
    cscout completions bash > ~/.local/share/bash-completion/completions/cscout
    cscout completions zsh > ~/.zfunc/_cscout")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Arguments of `collect`
#[derive(Args, Debug, Clone, Default)]
pub struct CollectArgs {
    /// Community to collect
    #[arg(long, env = "TWITTER_COMMUNITY_ID")]
    pub community_id: Option<String>,
    /// Stop after receiving this many members
    #[arg(long, short)]
    pub limit: Option<u64>,
    /// Member table to append to
    #[arg(long, short, env = "TWITTER_OUTPUT_FILE")]
    pub output: Option<PathBuf>,
    /// Continue from the saved checkpoint
    #[arg(long = "continue")]
    pub resume: bool,
    /// Cursor to start from when not continuing
    #[arg(long)]
    pub cursor: Option<String>,
    /// Do not look up the community size first
    #[arg(long)]
    pub skip_info: bool,
}

/// Arguments of `classify`
#[derive(Args, Debug, Clone, Default)]
pub struct ClassifyArgs {
    /// Account to check follows against
    #[arg(long, short)]
    pub target: String,
    /// Member table to classify
    #[arg(long, short)]
    pub input: Option<PathBuf>,
    /// Only classify the first N accounts of the input
    #[arg(long, short)]
    pub limit: Option<usize>,
    /// Combined result table (ignored with --separate)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Write following and not-following username lists instead of one table
    #[arg(long)]
    pub separate: bool,
    /// Keep earlier results and skip accounts already classified
    #[arg(long = "continue")]
    pub resume: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration as TOML
    #[command(long_about = "Display the effective configuration in TOML format.

Values missing from the config file are shown with their defaults.

EXAMPLE:
    cscout config show")]
    Show,
    /// Print the config file location
    #[command(long_about = "Print the path of the configuration file.

EXAMPLE:
    cscout config path")]
    Path,
}
