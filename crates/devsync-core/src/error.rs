// ── Core error types ──
//
// Domain-level errors from devsync-core. Hosts never see HTTP status
// codes or reqwest errors directly: the `From<devsync_api::Error>` impl
// folds transport failures into network and decode errors.

use thiserror::Error;

use crate::config::{ConfigField, ConfigIssue};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration ────────────────────────────────────────────────
    /// One or more settings are absent or malformed. Fatal until reconfigured.
    #[error("Configuration error: {}", summarize(.issues))]
    Configuration { issues: Vec<ConfigIssue> },

    // ── Device communication ─────────────────────────────────────────
    /// Connection refused, timeout, non-2xx status, or a device rejection.
    #[error("Network error: {message}")]
    Network { message: String, transient: bool },

    /// The device answered with a body that is not a usable state document.
    #[error("Decode error: {message}")]
    Decode { message: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Type mismatch on channel '{channel}': expected {expected}, got {got}")]
    TypeMismatch {
        channel: String,
        expected: &'static str,
        got: String,
    },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Device agent has not been initialized")]
    NotConfigured,

    #[error("Device agent has been disposed")]
    Disposed,
}

impl CoreError {
    /// Shorthand for a single-field configuration error.
    pub fn config(field: ConfigField, reason: impl Into<String>) -> Self {
        Self::Configuration {
            issues: vec![ConfigIssue::new(field, reason)],
        }
    }

    /// Returns `true` for errors the next scheduled poll may recover from:
    /// transient network failures and undecodable bodies. A rejected PIN
    /// or a 4xx status stays broken until the device is reconfigured.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { transient, .. } => *transient,
            Self::Decode { .. } => true,
            _ => false,
        }
    }

    /// Fields named by a configuration error (empty for other kinds).
    pub fn failed_fields(&self) -> Vec<ConfigField> {
        match self {
            Self::Configuration { issues } => issues.iter().map(|i| i.field).collect(),
            _ => Vec::new(),
        }
    }
}

fn summarize(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<devsync_api::Error> for CoreError {
    fn from(err: devsync_api::Error) -> Self {
        let transient = err.is_transient();
        match err {
            devsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Decode { message }
            }
            devsync_api::Error::InvalidUrl(e) => {
                CoreError::config(ConfigField::StatePath, format!("invalid device URL: {e}"))
            }
            devsync_api::Error::Tls(msg) => CoreError::config(ConfigField::Tls, msg),
            devsync_api::Error::Rejected {
                error_code,
                status_code,
            } => CoreError::Network {
                message: format!("device rejected request (HTTP {status_code}): {error_code}"),
                transient,
            },
            other => CoreError::Network {
                message: other.to_string(),
                transient,
            },
        }
    }
}
