use thiserror::Error;

/// Top-level error type for the `devsync-api` crate.
///
/// Covers every failure mode of a single device request: transport,
/// HTTP status, vendor error envelopes, and body decoding.
/// `devsync-core` folds these into network and decode failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Device responses ────────────────────────────────────────────
    /// Non-2xx response without a recognizable error envelope.
    #[error("Device returned HTTP {status}")]
    Status { status: u16, body: String },

    /// Structured rejection (`JsonRestExceptionResponseEntity` envelope).
    #[error("Device rejected request (HTTP {status_code}): {error_code}")]
    Rejected { error_code: String, status_code: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the device answered but the body could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }

    /// HTTP status reported by the device, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Rejected { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}
