// Transport settings for device HTTP clients.
//
// Embedded device firmware answers one request at a time and often drops
// idle connections, so clients keep a single pooled connection and fail
// fast when the device is unreachable.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("devsync/", env!("CARGO_PKG_VERSION"));

/// Upper bound for establishing a TCP/TLS connection.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Idle connections older than this are not reused.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// How the device certificate is checked when the device speaks HTTPS.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate, for self-signed device firmware.
    DangerAcceptInvalid,
}

/// TLS mode and request timeout for one device.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Upper bound for a whole request, connect through body.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Connect timeout: the request timeout, capped at three seconds.
    pub fn connect_timeout(&self) -> Duration {
        self.timeout.min(MAX_CONNECT_TIMEOUT)
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout())
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    Error::Tls(format!("cannot read CA certificate {}: {e}", path.display()))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| Error::Tls(format!("invalid CA certificate: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("cannot build device HTTP client: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        assert!(TransportConfig::default().build_client().is_ok());
    }

    #[test]
    fn connect_timeout_is_capped() {
        let slow = TransportConfig {
            timeout: Duration::from_secs(10),
            ..TransportConfig::default()
        };
        assert_eq!(slow.connect_timeout(), Duration::from_secs(3));

        let fast = TransportConfig {
            timeout: Duration::from_secs(1),
            ..TransportConfig::default()
        };
        assert_eq!(fast.connect_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn missing_ca_file_is_tls_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/devsync-ca.pem")),
            ..TransportConfig::default()
        };
        assert!(matches!(config.build_client(), Err(Error::Tls(_))));
    }
}
