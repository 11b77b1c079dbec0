//! Clap derive structures for the `devsync` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// devsync -- poll a smart-home device and forward commands to it
#[derive(Debug, Parser)]
#[command(
    name = "devsync",
    version,
    about = "Synchronize state with polled smart-home devices",
    long_about = "Polls a device's HTTP+JSON state document on a fixed delay,\n\
        maps its fields to typed channels, and forwards commands back.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "DEVSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Device profile to use
    #[arg(long, short = 'd', env = "DEVSYNC_DEVICE", global = true)]
    pub device: Option<String>,

    /// Device address, host or IP with optional port (overrides profile)
    #[arg(long, short = 'a', env = "DEVSYNC_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Device PIN
    #[arg(long, env = "DEVSYNC_PIN", global = true, hide_env_values = true)]
    pub pin: Option<String>,

    /// Poll interval in seconds (1-999)
    #[arg(long, short = 'i', global = true, allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Request timeout in seconds
    #[arg(long, env = "DEVSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DEVSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the device state once and show channel values
    Get(GetArgs),

    /// Poll continuously and print channel changes until Ctrl-C
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Send a command to a writable channel
    Set(SetArgs),

    /// List the channels of the selected device's catalog
    #[command(alias = "ch")]
    Channels,

    /// Manage the configuration file and stored PINs
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Channels to show (all when omitted)
    pub channels: Vec<String>,

    /// Show the raw snapshot fields instead of channels
    #[arg(long, conflicts_with = "channels")]
    pub raw: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Channels to watch (all when omitted)
    pub channels: Vec<String>,

    /// Exit after this many channel updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Channel id, e.g. `power` or `spTemp`
    pub channel: String,

    /// Value: on/off, a number, a number with unit (`21.5°C`), or text
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (PINs redacted)
    Show,

    /// Store a device PIN in the system keyring
    SetPin {
        /// Profile to store the PIN for (defaults to the active device)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
