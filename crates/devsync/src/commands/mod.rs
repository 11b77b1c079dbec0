//! Command handlers and the helpers they share.

pub mod channels;
pub mod config_cmd;
pub mod get;
pub mod set;
pub mod watch;

use std::sync::Arc;

use clap::CommandFactory;
use devsync_core::{
    ChannelCatalog, ChannelId, DeviceListener, DeviceStatus, DeviceSyncAgent, OfflineReason,
};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::config::ResolvedDevice;
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Get(args) => get::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Set(args) => set::handle(args, global).await,
        Command::Channels => channels::handle(global),
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "devsync", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Validate the device, run the initial fetch, and require it to succeed.
async fn connect(
    device: ResolvedDevice,
    listener: Arc<dyn DeviceListener>,
) -> Result<DeviceSyncAgent, CliError> {
    let address = device.settings.address.clone().unwrap_or_default();
    tracing::info!(device = %device.name, %address, "connecting");
    let agent = DeviceSyncAgent::new(device.settings, device.catalog, listener);

    if let DeviceStatus::Offline {
        reason: OfflineReason::CommunicationError,
        message,
    } = agent.initialize().await?
    {
        agent.dispose().await;
        return Err(CliError::ConnectionFailed { address, message });
    }
    Ok(agent)
}

/// Channel ids named on the command line, or every channel when none are.
fn select_channels(catalog: &ChannelCatalog, names: &[String]) -> Result<Vec<ChannelId>, CliError> {
    if names.is_empty() {
        return Ok(catalog.ids());
    }
    names
        .iter()
        .map(|name| {
            let id = ChannelId::from(name.as_str());
            if catalog.get(&id).is_some() {
                Ok(id)
            } else {
                Err(CliError::UnknownChannel {
                    channel: name.clone(),
                })
            }
        })
        .collect()
}
