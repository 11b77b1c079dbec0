//! Device profiles for devsync.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `devsync_core::DeviceSettings` plus the channel catalog
//! a profile selects. Validation of the resulting settings stays in
//! `devsync-core`; this crate only checks what it must to build them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use devsync_core::catalog::PELLET_STOVE;
use devsync_core::{
    ChannelCatalog, ChannelDefinition, CoreError, CredentialFormat, CredentialPlacement,
    DEFAULT_CREDENTIAL_HEADER, DeviceSettings, TlsVerification, WriteMethod,
};

/// Keyring service name; entries are `<profile>/pin`.
pub const KEYRING_SERVICE: &str = "devsync";

/// Prefix for environment overrides (`DEVSYNC_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "DEVSYNC_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no PIN configured for device '{profile}'")]
    NoCredentials { profile: String },

    #[error("device profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("unknown channel catalog '{name}'")]
    UnknownCatalog { name: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Device profile used when none is named.
    pub default_device: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub devices: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_device: Some("default".into()),
            defaults: Defaults::default(),
            devices: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, falling back to `default_device`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_device.as_deref())
            .unwrap_or("default");
        self.devices
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: i64,

    /// Request timeout in seconds. Unset means `min(10, poll_interval)`.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            poll_interval: default_poll_interval(),
            timeout: None,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_poll_interval() -> i64 {
    30
}

/// A named device profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Host name or IP, optionally with `:port`.
    pub address: String,

    /// PIN in plaintext (prefer keyring or env var).
    pub pin: Option<String>,

    /// Environment variable name containing the PIN.
    pub pin_env: Option<String>,

    #[serde(default)]
    pub credential_format: CredentialFormat,

    /// Where the PIN travels: "header", "hashed-header", "query" or "body".
    pub credential: Option<String>,

    /// Header, query parameter, or body field name for the PIN.
    pub credential_name: Option<String>,

    pub poll_interval: Option<i64>,
    pub timeout: Option<u64>,

    #[serde(default)]
    pub https: bool,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub state_path: Option<String>,

    /// "post" or "put".
    pub write_method: Option<String>,

    /// Consecutive failed polls before the device is reported offline.
    pub offline_after_failures: Option<u32>,

    /// Built-in catalog name. Ignored when `channels` is set.
    pub catalog: Option<String>,

    /// Custom channel table.
    pub channels: Option<Vec<ChannelDefinition>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "devsync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("devsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/pin"),
    )?)
}

/// Resolve a device PIN from the credential chain:
/// `pin_env` → system keyring → plaintext `pin`.
pub fn resolve_pin(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's pin_env → env var lookup
    if let Some(val) = profile
        .pin_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Ok(secret) = keyring_entry(profile_name).and_then(|e| e.get_password().map_err(ConfigError::from)) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref pin) = profile.pin {
        return Ok(SecretString::from(pin.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a device PIN in the system keyring.
pub fn store_pin(profile_name: &str, pin: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(pin)?;
    Ok(())
}

// ── Profile translation ─────────────────────────────────────────────

/// Build unvalidated `DeviceSettings` and the channel catalog for a profile.
///
/// A missing credential is left unset so validation reports it alongside
/// any other problems.
pub fn profile_to_settings(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<(DeviceSettings, ChannelCatalog), ConfigError> {
    let credential = match resolve_pin(profile, profile_name) {
        Ok(pin) => Some(pin),
        Err(ConfigError::NoCredentials { .. }) => None,
        Err(e) => return Err(e),
    };

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut settings = DeviceSettings {
        address: Some(profile.address.clone()),
        credential,
        credential_format: profile.credential_format,
        poll_interval_secs: profile.poll_interval.unwrap_or(defaults.poll_interval),
        timeout: profile.timeout.or(defaults.timeout).map(Duration::from_secs),
        https: profile.https,
        tls,
        credential_placement: parse_placement(
            profile.credential.as_deref(),
            profile.credential_name.as_deref(),
        )?,
        write_method: parse_write_method(profile.write_method.as_deref())?,
        ..DeviceSettings::default()
    };
    if let Some(ref path) = profile.state_path {
        settings.state_path.clone_from(path);
    }
    if let Some(n) = profile.offline_after_failures {
        settings.offline_after_failures = n;
    }

    Ok((settings, profile_catalog(profile, profile_name)?))
}

/// The catalog a profile selects: its own channel table, a named built-in,
/// or the pellet-stove catalog.
pub fn profile_catalog(profile: &Profile, profile_name: &str) -> Result<ChannelCatalog, ConfigError> {
    if let Some(ref channels) = profile.channels {
        return Ok(ChannelCatalog::new(profile_name, channels.clone())?);
    }

    let name = profile.catalog.as_deref().unwrap_or(PELLET_STOVE);
    ChannelCatalog::builtin(name).ok_or_else(|| ConfigError::UnknownCatalog { name: name.into() })
}

fn parse_placement(
    kind: Option<&str>,
    name: Option<&str>,
) -> Result<CredentialPlacement, ConfigError> {
    let named = |default: &str| name.unwrap_or(default).to_owned();
    match kind.unwrap_or("header") {
        "header" => Ok(name.map_or_else(CredentialPlacement::default, |n| {
            CredentialPlacement::Header(n.into())
        })),
        "query" => Ok(CredentialPlacement::Query(named("pin"))),
        "body" => Ok(CredentialPlacement::Body(named("pin"))),
        "hashed-header" => Ok(CredentialPlacement::HashedHeader(named(
            DEFAULT_CREDENTIAL_HEADER,
        ))),
        other => Err(ConfigError::Validation {
            field: "credential".into(),
            reason: format!(
                "expected 'header', 'hashed-header', 'query' or 'body', got '{other}'"
            ),
        }),
    }
}

fn parse_write_method(method: Option<&str>) -> Result<WriteMethod, ConfigError> {
    match method.map(str::to_ascii_lowercase).as_deref() {
        None | Some("post") => Ok(WriteMethod::Post),
        Some("put") => Ok(WriteMethod::Put),
        Some(other) => Err(ConfigError::Validation {
            field: "write_method".into(),
            reason: format!("expected 'post' or 'put', got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn placement_defaults_to_pin_header() {
        assert_eq!(
            parse_placement(None, None).unwrap(),
            CredentialPlacement::default()
        );
        assert_eq!(
            parse_placement(Some("header"), Some("X-Auth")).unwrap(),
            CredentialPlacement::Header("X-Auth".into())
        );
        assert_eq!(
            parse_placement(Some("query"), None).unwrap(),
            CredentialPlacement::Query("pin".into())
        );
        assert_eq!(
            parse_placement(Some("hashed-header"), None).unwrap(),
            CredentialPlacement::HashedHeader("X-HS-PIN".into())
        );
    }

    #[test]
    fn unknown_placement_is_rejected() {
        let err = parse_placement(Some("cookie"), None).unwrap_err();
        assert!(err.to_string().contains("cookie"), "{err}");
    }

    #[test]
    fn write_method_is_case_insensitive() {
        assert_eq!(parse_write_method(Some("PUT")).unwrap(), WriteMethod::Put);
        assert_eq!(parse_write_method(None).unwrap(), WriteMethod::Post);
        assert!(parse_write_method(Some("patch")).is_err());
    }

    #[test]
    fn profile_lookup_falls_back_to_default_device() {
        let mut cfg = Config::default();
        cfg.devices.insert(
            "default".into(),
            Profile {
                address: "10.0.0.5".into(),
                ..Profile::default()
            },
        );

        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile.address, "10.0.0.5");
        assert!(matches!(
            cfg.profile(Some("garage")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }
}
