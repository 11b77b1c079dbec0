//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use devsync_config::ConfigError;
use devsync_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device communication ─────────────────────────────────────────
    #[error("Could not reach device at {address}: {message}")]
    #[diagnostic(
        code(devsync::connection_failed),
        help(
            "Check that the device is powered on and reachable.\n\
             Increase the request timeout with --timeout if it is slow to answer."
        )
    )]
    ConnectionFailed { address: String, message: String },

    #[error("Device sent an unusable response: {message}")]
    #[diagnostic(
        code(devsync::bad_response),
        help("The device firmware may not match the selected channel catalog.")
    )]
    BadResponse { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid device configuration: {message}")]
    #[diagnostic(
        code(devsync::invalid_config),
        help("Fix the device profile, or pass --address / --pin / --interval.")
    )]
    InvalidConfig { message: String },

    #[error("No device configured")]
    #[diagnostic(
        code(devsync::no_config),
        help(
            "Pass --address and --pin, or add a [devices.default] profile.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Device profile '{name}' not found in configuration")]
    #[diagnostic(code(devsync::profile_not_found), help("Available profiles: {available}"))]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(devsync::config))]
    Config(Box<ConfigError>),

    // ── Channels & commands ──────────────────────────────────────────
    #[error("Channel '{channel}' not found")]
    #[diagnostic(
        code(devsync::unknown_channel),
        help("Run: devsync channels to see available channels")
    )]
    UnknownChannel { channel: String },

    #[error("Channel '{channel}' is read-only")]
    #[diagnostic(code(devsync::read_only))]
    ReadOnlyChannel { channel: String },

    #[error("Channel '{channel}' expects {expected}, got {got}")]
    #[diagnostic(code(devsync::type_mismatch))]
    TypeMismatch {
        channel: String,
        expected: String,
        got: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(devsync::validation))]
    Validation { field: String, reason: String },

    #[error("Device agent stopped: {message}")]
    #[diagnostic(code(devsync::agent))]
    Agent { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(devsync::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode TOML: {0}")]
    #[diagnostic(code(devsync::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::InvalidConfig { .. }
            | Self::NoConfig { .. }
            | Self::ProfileNotFound { .. }
            | Self::Config(_) => exit_code::CONFIG,
            Self::UnknownChannel { .. } => exit_code::NOT_FOUND,
            Self::ReadOnlyChannel { .. } | Self::TypeMismatch { .. } | Self::Validation { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(see devsync config show)".into(),
            },
            ConfigError::Core(core) => core.into(),
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration { issues } => Self::InvalidConfig {
                message: issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            },
            CoreError::Network { message, .. } => Self::ConnectionFailed {
                address: "(device)".into(),
                message,
            },
            CoreError::Decode { message } => Self::BadResponse { message },
            CoreError::TypeMismatch {
                channel,
                expected,
                got,
            } => Self::TypeMismatch {
                channel,
                expected: expected.into(),
                got,
            },
            CoreError::NotConfigured | CoreError::Disposed => Self::Agent {
                message: err.to_string(),
            },
        }
    }
}
