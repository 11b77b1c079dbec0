//! `devsync channels`: list the selected catalog.

use tabled::Tabled;

use devsync_core::ChannelDefinition;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Channel")]
    id: String,
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Access")]
    access: &'static str,
}

fn row(def: &ChannelDefinition) -> ChannelRow {
    ChannelRow {
        id: def.id.to_string(),
        field: def.field.clone(),
        kind: def.kind.label(),
        access: if def.writable { "read/write" } else { "read" },
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let catalog = config::resolve_catalog(global)?;
    let defs: Vec<ChannelDefinition> = catalog.iter().cloned().collect();

    let rendered = output::render_list(global.output, &defs, row, |d| {
        d.id.to_string()
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
