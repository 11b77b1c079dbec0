//! Config subcommand handlers.

use devsync_config::store_pin;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path(global).display().to_string(), false);
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load(global)?;
            for profile in cfg.devices.values_mut() {
                if profile.pin.is_some() {
                    profile.pin = Some(REDACTED.into());
                }
            }

            let rendered = match global.output {
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        // ── SetPin ──────────────────────────────────────────────────
        ConfigCommand::SetPin { profile } => {
            let cfg = config::load(global)?;
            let name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            let (name, prof) = cfg.profile(Some(&name))?;

            let pin = rpassword::prompt_password(format!("PIN for '{name}': "))?;
            prof.credential_format
                .check(&pin)
                .map_err(|reason| CliError::Validation {
                    field: "pin".into(),
                    reason,
                })?;

            store_pin(name, &pin)?;
            if !global.quiet {
                eprintln!("✓ PIN for '{name}' stored in system keyring");
            }
            Ok(())
        }
    }
}
