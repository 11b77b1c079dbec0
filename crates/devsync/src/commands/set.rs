//! `devsync set <channel> <value>`: send one command and show the result.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use devsync_core::dispatch::build_write;
use devsync_core::{ChannelId, ChannelState, CommandValue, DispatchOutcome};

use super::connect;
use crate::cli::{GlobalOpts, SetArgs};
use crate::config;
use crate::error::CliError;
use crate::listener::LogListener;
use crate::output;

#[derive(Serialize)]
struct SetResult {
    channel: String,
    field: String,
    sent: Value,
    state: ChannelState,
}

pub async fn handle(args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let device = config::resolve_device(global)?;
    let channel = ChannelId::from(args.channel.as_str());

    let Some(def) = device.catalog.get(&channel) else {
        return Err(CliError::UnknownChannel {
            channel: args.channel,
        });
    };
    if !def.writable {
        return Err(CliError::ReadOnlyChannel {
            channel: args.channel,
        });
    }

    // Type-check before touching the network.
    let Ok(command) = args.value.parse::<CommandValue>();
    build_write(&device.catalog, &channel, &command)?;

    let agent = connect(device, Arc::new(LogListener)).await?;
    let outcome = agent.handle_command(&channel, command).await;
    let state = agent.channel_state(&channel);
    agent.dispose().await;

    let DispatchOutcome::Sent { field, value } = outcome? else {
        return Err(CliError::ReadOnlyChannel {
            channel: args.channel,
        });
    };

    let result = SetResult {
        channel: args.channel,
        field,
        sent: value,
        state,
    };
    let rendered = output::render_single(
        global.output,
        &result,
        |r| format!("✓ {} set ({} = {}); now {}", r.channel, r.field, r.sent, r.state),
        |r| r.state.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
