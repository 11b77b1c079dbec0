//! Device resolution for the CLI: config file + profile + flag overrides.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use devsync_config::{Config, profile_catalog, profile_to_settings};
use devsync_core::{ChannelCatalog, DeviceSettings, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// A device ready to hand to an agent.
pub struct ResolvedDevice {
    pub name: String,
    pub settings: DeviceSettings,
    pub catalog: ChannelCatalog,
}

pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(devsync_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(devsync_config::load_config_from(&config_path(global))?)
}

/// Name of the profile the flags select, falling back to the config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .device
        .clone()
        .or_else(|| cfg.default_device.clone())
        .unwrap_or_else(|| "default".into())
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.devices.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Resolve the device to talk to. A matching profile is used with flag
/// overrides; without one, `--address` alone describes the device.
pub fn resolve_device(global: &GlobalOpts) -> Result<ResolvedDevice, CliError> {
    let cfg = load(global)?;
    let name = active_profile_name(global, &cfg);

    let (mut settings, catalog) = match cfg.devices.get(&name) {
        Some(profile) => profile_to_settings(profile, &name, &cfg.defaults)?,
        None if global.device.is_some() => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(&cfg),
                name,
            });
        }
        None if global.address.is_some() => {
            let settings = DeviceSettings {
                poll_interval_secs: cfg.defaults.poll_interval,
                timeout: cfg.defaults.timeout.map(Duration::from_secs),
                ..DeviceSettings::default()
            };
            (settings, ChannelCatalog::pellet_stove())
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path(global).display().to_string(),
            });
        }
    };

    apply_overrides(&mut settings, global);
    tracing::debug!(device = %name, catalog = catalog.name(), "resolved device");

    Ok(ResolvedDevice {
        name,
        settings,
        catalog,
    })
}

/// The catalog for listings; works without a reachable device or PIN.
pub fn resolve_catalog(global: &GlobalOpts) -> Result<ChannelCatalog, CliError> {
    let cfg = load(global)?;
    let name = active_profile_name(global, &cfg);
    match cfg.devices.get(&name) {
        Some(profile) => Ok(profile_catalog(profile, &name)?),
        None if global.device.is_some() => Err(CliError::ProfileNotFound {
            available: available_profiles(&cfg),
            name,
        }),
        None => Ok(ChannelCatalog::pellet_stove()),
    }
}

fn apply_overrides(settings: &mut DeviceSettings, global: &GlobalOpts) {
    if let Some(ref address) = global.address {
        settings.address = Some(address.clone());
    }
    if let Some(ref pin) = global.pin {
        settings.credential = Some(SecretString::from(pin.clone()));
    }
    if let Some(interval) = global.interval {
        settings.poll_interval_secs = interval;
    }
    if let Some(timeout) = global.timeout {
        settings.timeout = Some(Duration::from_secs(timeout));
    }
    if global.insecure {
        settings.tls = TlsVerification::DangerAcceptInvalid;
    }
}
