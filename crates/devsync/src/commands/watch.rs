//! `devsync watch`: link channels, poll until Ctrl-C, print changes.

use std::sync::Arc;

use devsync_core::DeviceSyncAgent;
use tracing::info;

use super::select_channels;
use crate::cli::{GlobalOpts, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::listener::WatchPrinter;
use crate::output;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let device = config::resolve_device(global)?;
    let channels = select_channels(&device.catalog, &args.channels)?;

    let printer = Arc::new(WatchPrinter::new(
        global.output,
        output::should_color(global.color),
        global.quiet,
        args.count,
    ));
    let agent = DeviceSyncAgent::new(device.settings, device.catalog, printer.clone());

    for id in channels {
        agent.channel_linked(id)?;
    }

    // Communication failures keep polling; only configuration errors end the watch.
    if let Err(e) = agent.initialize().await {
        agent.dispose().await;
        return Err(e.into());
    }

    let interrupted = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            true
        }
        () = printer.finished() => false,
    };
    if interrupted {
        info!("interrupted; stopping");
    }

    agent.dispose().await;
    Ok(())
}
