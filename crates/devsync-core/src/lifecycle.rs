// ── Device lifecycle ──
//
// Unconfigured → Validating → Online ⇄ Offline → Disposed

use std::fmt;

use serde::Serialize;
use strum::Display;

/// Why a device is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfflineReason {
    /// Bad address, credential, or interval. Persists until reconfigured.
    ConfigurationError,
    /// Network, timeout, HTTP status, or decode failure.
    CommunicationError,
}

/// Lifecycle status of a device agent, observable by hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Unconfigured,
    Validating,
    Online,
    Offline {
        reason: OfflineReason,
        message: String,
    },
    Disposed,
}

impl DeviceStatus {
    /// Online or Offline: the agent holds a configuration and reacts to
    /// subscription changes.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Online | Self::Offline { .. })
    }

    pub fn offline_reason(&self) -> Option<OfflineReason> {
        match self {
            Self::Offline { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: &DeviceStatus) -> bool {
        match (self, next) {
            (Self::Disposed, _) => false,
            (_, Self::Disposed) => true,
            (Self::Unconfigured, Self::Validating) => true,
            (Self::Validating | Self::Online | Self::Offline { .. }, Self::Online | Self::Offline { .. }) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => f.write_str("UNCONFIGURED"),
            Self::Validating => f.write_str("VALIDATING"),
            Self::Online => f.write_str("ONLINE"),
            Self::Offline { reason, message } => write!(f, "OFFLINE ({reason}): {message}"),
            Self::Disposed => f.write_str("DISPOSED"),
        }
    }
}
