//! `devsync get`: one fetch, then a table of channel states.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use devsync_core::{ChannelState, FieldValue};

use super::{connect, select_channels};
use crate::cli::{GetArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::listener::LogListener;
use crate::output;

#[derive(Serialize)]
struct Reading {
    channel: String,
    field: String,
    kind: String,
    state: ChannelState,
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Field")]
    field: String,
}

#[derive(Serialize)]
struct RawField<'a> {
    field: &'a str,
    value: &'a FieldValue,
}

#[derive(Tabled)]
struct RawRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub async fn handle(args: GetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let device = config::resolve_device(global)?;
    let channels = select_channels(&device.catalog, &args.channels)?;
    let agent = connect(device, Arc::new(LogListener)).await?;
    let color = output::should_color(global.color);

    let rendered = if args.raw {
        let snapshot = agent.snapshot();
        let fields: Vec<RawField<'_>> = snapshot
            .iter()
            .flat_map(|s| s.fields())
            .map(|(field, value)| RawField { field, value })
            .collect();
        output::render_list(
            global.output,
            &fields,
            |f| RawRow {
                field: f.field.to_owned(),
                value: f.value.to_string(),
            },
            |f| format!("{}={}", f.field, f.value),
        )
    } else {
        let readings: Vec<Reading> = channels
            .iter()
            .filter_map(|id| agent.catalog().get(id))
            .map(|def| Reading {
                channel: def.id.to_string(),
                field: def.field.clone(),
                kind: def.kind.label(),
                state: agent.channel_state(&def.id),
            })
            .collect();
        output::render_list(
            global.output,
            &readings,
            |r| ReadingRow {
                channel: r.channel.clone(),
                state: output::paint_state(&r.state, color),
                kind: r.kind.clone(),
                field: r.field.clone(),
            },
            |r| format!("{}={}", r.channel, r.state),
        )
    };

    agent.dispose().await;
    output::print_output(&rendered?, global.quiet);
    Ok(())
}
