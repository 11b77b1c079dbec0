// ── Device connection configuration ──
//
// `DeviceSettings` is what a host hands in: raw, possibly incomplete.
// `DeviceSettings::validate` turns it into an immutable `DeviceConfig`
// or a configuration error naming every failing field.
// Core never reads config files; devsync-config does that.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use devsync_api::client::DEFAULT_STATE_PATH;
use devsync_api::{CredentialPlacement, WriteMethod};

use crate::error::CoreError;

/// Poll interval bounds: `MIN_POLL_INTERVAL_SECS <= n <= MAX_POLL_INTERVAL_SECS`.
pub const MIN_POLL_INTERVAL_SECS: i64 = 1;
pub const MAX_POLL_INTERVAL_SECS: i64 = 999;

const DEFAULT_POLL_INTERVAL_SECS: i64 = 30;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const PIN_LENGTH: usize = 4;

// ── Validation diagnostics ───────────────────────────────────────────

/// A configuration field that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    Address,
    Credential,
    PollInterval,
    Timeout,
    StatePath,
    Tls,
    Channels,
}

/// One failed check: which field and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: ConfigField,
    pub reason: String,
}

impl ConfigIssue {
    pub fn new(field: ConfigField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

// ── Credential format ────────────────────────────────────────────────

/// Device-specific credential syntax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CredentialFormat {
    /// Exactly four ASCII digits.
    #[default]
    Pin,
    /// Any non-empty string without whitespace.
    Token,
}

impl CredentialFormat {
    /// Check `credential`, returning a human-readable reason on failure.
    pub fn check(self, credential: &str) -> Result<(), String> {
        match self {
            Self::Pin => {
                if credential.len() == PIN_LENGTH && credential.bytes().all(|b| b.is_ascii_digit())
                {
                    Ok(())
                } else {
                    Err(format!("a valid PIN consists of exactly {PIN_LENGTH} digits"))
                }
            }
            Self::Token => {
                if credential.is_empty() {
                    Err("token must not be empty".into())
                } else if credential.chars().any(char::is_whitespace) {
                    Err("token must not contain whitespace".into())
                } else {
                    Ok(())
                }
            }
        }
    }
}

// ── TLS ──────────────────────────────────────────────────────────────

/// TLS verification strategy for devices served over HTTPS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed firmware certificates).
    DangerAcceptInvalid,
}

// ── Address ──────────────────────────────────────────────────────────

/// A syntactically valid network address: IP literal or host name, optional port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    host: Host,
    port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Host {
    Ip(IpAddr),
    Name(String),
}

impl DeviceAddress {
    /// The host part as it would appear in a URL (IPv6 bracketed).
    pub fn host(&self) -> String {
        match &self.host {
            Host::Ip(IpAddr::V6(v6)) => format!("[{v6}]"),
            Host::Ip(ip) => ip.to_string(),
            Host::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host()),
            None => f.write_str(&self.host()),
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("address is empty".into());
        }

        // Bare IP literal, including unbracketed IPv6.
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self {
                host: Host::Ip(ip),
                port: None,
            });
        }

        // [v6]:port or [v6]
        if let Some(rest) = s.strip_prefix('[') {
            let (inner, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("'{s}' has an unterminated IPv6 bracket"))?;
            let ip: IpAddr = inner
                .parse()
                .map_err(|_| format!("'{inner}' is not a valid IPv6 address"))?;
            let port = match tail {
                "" => None,
                t => Some(parse_port(t.strip_prefix(':').unwrap_or(t))?),
            };
            return Ok(Self {
                host: Host::Ip(ip),
                port,
            });
        }

        let (host, port) = match s.split_once(':') {
            Some((host, port)) => (host, Some(parse_port(port)?)),
            None => (s, None),
        };

        if let Ok(v4) = host.parse::<Ipv4Addr>() {
            return Ok(Self {
                host: Host::Ip(IpAddr::V4(v4)),
                port,
            });
        }

        Ok(Self {
            host: Host::Name(parse_hostname(host)?),
            port,
        })
    }
}

fn parse_port(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("'{s}' is not a valid port")),
        Ok(port) => Ok(port),
    }
}

/// Host name check on top of `url`'s host parser. Anything the parser
/// reads as an IPv4 literal is rejected here: canonical dotted quads were
/// accepted earlier, so `999.1.1.1` or `1.2.3` is never taken for a name.
fn parse_hostname(host: &str) -> Result<String, String> {
    match url::Host::parse(host) {
        Ok(url::Host::Domain(name)) if !name.is_empty() => Ok(name),
        _ => Err(format!("'{host}' is not a valid IP address or host name")),
    }
}

// ── Settings (unvalidated) ───────────────────────────────────────────

/// Raw device settings as supplied by a host.
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    /// Device address (e.g. `192.168.1.50` or `stove.local:8080`). Required.
    pub address: Option<String>,
    /// PIN or token. Required.
    pub credential: Option<SecretString>,
    pub credential_format: CredentialFormat,
    /// Seconds between the end of one poll and the start of the next.
    /// Signed so that negative input is reported rather than rejected by a parser.
    pub poll_interval_secs: i64,
    /// Per-request timeout. Defaults to 10s or the poll interval, whichever is shorter.
    pub timeout: Option<Duration>,
    pub https: bool,
    pub tls: TlsVerification,
    pub state_path: String,
    pub credential_placement: CredentialPlacement,
    pub write_method: WriteMethod,
    /// Consecutive poll failures before the device is reported offline.
    pub offline_after_failures: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: None,
            credential: None,
            credential_format: CredentialFormat::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout: None,
            https: false,
            tls: TlsVerification::default(),
            state_path: DEFAULT_STATE_PATH.into(),
            credential_placement: CredentialPlacement::default(),
            write_method: WriteMethod::default(),
            offline_after_failures: 1,
        }
    }
}

impl DeviceSettings {
    /// Settings with the two required fields filled in and defaults elsewhere.
    pub fn new(address: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            credential: Some(SecretString::from(credential.into())),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, secs: i64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Validate every field, collecting all failures.
    pub fn validate(&self) -> Result<DeviceConfig, CoreError> {
        let mut issues = Vec::new();

        let address = match self.address.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push(ConfigIssue::new(
                    ConfigField::Address,
                    "device address must be configured",
                ));
                None
            }
            Some(raw) => match raw.parse::<DeviceAddress>() {
                Ok(addr) => Some(addr),
                Err(reason) => {
                    issues.push(ConfigIssue::new(ConfigField::Address, reason));
                    None
                }
            },
        };

        match &self.credential {
            None => issues.push(ConfigIssue::new(
                ConfigField::Credential,
                "credential must be configured",
            )),
            Some(secret) => {
                if let Err(reason) = self.credential_format.check(secret.expose_secret()) {
                    issues.push(ConfigIssue::new(ConfigField::Credential, reason));
                }
            }
        }

        let interval_ok =
            (MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&self.poll_interval_secs);
        if !interval_ok {
            issues.push(ConfigIssue::new(
                ConfigField::PollInterval,
                format!(
                    "poll interval must be greater than 0 and less than 1000 (got {})",
                    self.poll_interval_secs
                ),
            ));
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            issues.push(ConfigIssue::new(
                ConfigField::Timeout,
                "timeout must be greater than 0",
            ));
        }

        if !self.state_path.starts_with('/') {
            issues.push(ConfigIssue::new(
                ConfigField::StatePath,
                format!("state path must start with '/' (got '{}')", self.state_path),
            ));
        }

        let (Some(address), Some(credential), true, true) = (
            address,
            self.credential.clone(),
            interval_ok,
            issues.is_empty(),
        ) else {
            return Err(CoreError::Configuration { issues });
        };

        let poll_interval = Duration::from_secs(self.poll_interval_secs.unsigned_abs());
        let timeout = self
            .timeout
            .unwrap_or_else(|| DEFAULT_TIMEOUT.min(poll_interval));

        Ok(DeviceConfig {
            address,
            credential,
            poll_interval,
            timeout,
            https: self.https,
            tls: self.tls.clone(),
            state_path: self.state_path.clone(),
            credential_placement: self.credential_placement.clone(),
            write_method: self.write_method,
            offline_after_failures: self.offline_after_failures.max(1),
        })
    }
}

// ── Config (validated) ───────────────────────────────────────────────

/// Validated, immutable device configuration.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub address: DeviceAddress,
    pub credential: SecretString,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub https: bool,
    pub tls: TlsVerification,
    pub state_path: String,
    pub credential_placement: CredentialPlacement,
    pub write_method: WriteMethod,
    pub offline_after_failures: u32,
}

impl DeviceConfig {
    /// Device root URL, e.g. `http://192.168.1.50/`.
    pub fn base_url(&self) -> Result<Url, CoreError> {
        let scheme = if self.https { "https" } else { "http" };
        Url::parse(&format!("{scheme}://{}/", self.address)).map_err(|e| {
            CoreError::config(ConfigField::Address, format!("cannot form device URL: {e}"))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(err: &CoreError) -> Vec<ConfigField> {
        err.failed_fields()
    }

    #[test]
    fn accepts_valid_settings() {
        let config = DeviceSettings::new("192.168.1.50", "1234")
            .with_poll_interval(60)
            .validate()
            .unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.base_url().unwrap().as_str(), "http://192.168.1.50/");
    }

    #[test]
    fn interval_bounds_are_exclusive_of_zero_and_thousand() {
        for secs in [1, 500, 999] {
            assert!(
                DeviceSettings::new("10.0.0.2", "0000")
                    .with_poll_interval(secs)
                    .validate()
                    .is_ok(),
                "{secs} should be accepted"
            );
        }
        for secs in [-5, 0, 1000, 5000] {
            let err = DeviceSettings::new("10.0.0.2", "0000")
                .with_poll_interval(secs)
                .validate()
                .unwrap_err();
            assert_eq!(fields(&err), vec![ConfigField::PollInterval], "{secs}");
        }
    }

    #[test]
    fn short_interval_caps_default_timeout() {
        let config = DeviceSettings::new("10.0.0.2", "0000")
            .with_poll_interval(3)
            .validate()
            .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let err = DeviceSettings::default().validate().unwrap_err();
        assert_eq!(
            fields(&err),
            vec![ConfigField::Address, ConfigField::Credential]
        );
    }

    #[test]
    fn pin_must_be_four_digits() {
        for pin in ["123", "12345", "12a4", " 1234", ""] {
            let err = DeviceSettings::new("10.0.0.2", pin).validate().unwrap_err();
            assert_eq!(fields(&err), vec![ConfigField::Credential], "{pin:?}");
        }
    }

    #[test]
    fn token_format_allows_long_credentials() {
        let mut settings = DeviceSettings::new("shc.local", "a1b2-c3d4-e5f6");
        settings.credential_format = CredentialFormat::Token;
        assert!(settings.validate().is_ok());

        settings.credential = Some(SecretString::from("has space".to_string()));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn address_forms() {
        let ok = [
            ("192.168.1.50", "192.168.1.50"),
            ("192.168.1.50:8080", "192.168.1.50:8080"),
            ("::1", "[::1]"),
            ("[fe80::1]:8443", "[fe80::1]:8443"),
            ("Stove.Local", "stove.local"),
            ("pellet-1", "pellet-1"),
        ];
        for (input, display) in ok {
            let addr: DeviceAddress = input.parse().unwrap();
            assert_eq!(addr.to_string(), display);
        }

        let bad = [
            "999.1.1.1",
            "not an ip",
            "host:0",
            "host:70000",
            "1.2.3",
            "1234",
            "stove#1",
            "[::1",
            "http://192.168.1.1",
        ];
        for input in bad {
            assert!(input.parse::<DeviceAddress>().is_err(), "{input} should fail");
        }
    }

    #[test]
    fn https_base_url_keeps_port() {
        let mut settings = DeviceSettings::new("[fe80::1]:8443", "1234");
        settings.https = true;
        let config = settings.validate().unwrap();
        assert_eq!(config.base_url().unwrap().as_str(), "https://[fe80::1]:8443/");
    }

    #[test]
    fn state_path_must_be_absolute() {
        let mut settings = DeviceSettings::new("10.0.0.2", "1234");
        settings.state_path = "status.cgi".into();
        let err = settings.validate().unwrap_err();
        assert_eq!(fields(&err), vec![ConfigField::StatePath]);
    }

    #[test]
    fn zero_failure_threshold_is_raised_to_one() {
        let mut settings = DeviceSettings::new("10.0.0.2", "1234");
        settings.offline_after_failures = 0;
        assert_eq!(settings.validate().unwrap().offline_after_failures, 1);
    }
}
