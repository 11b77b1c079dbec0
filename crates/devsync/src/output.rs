//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use devsync_core::{ChannelState, DeviceStatus};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Device status, colored by health when `color` is set.
pub fn paint_status(status: &DeviceStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        DeviceStatus::Online => text.green().to_string(),
        DeviceStatus::Offline { .. } => text.red().to_string(),
        _ => text.yellow().to_string(),
    }
}

/// Channel state, dimmed when undefined.
pub fn paint_state(state: &ChannelState, color: bool) -> String {
    let text = state.to_string();
    match state {
        ChannelState::Undefined if color => text.dimmed().to_string(),
        ChannelState::OnOff(true) if color => text.bold().to_string(),
        _ => text,
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single serde-serializable item in the chosen format.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => line_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize, Tabled)]
    struct Row {
        channel: String,
        state: String,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                channel: "power".into(),
                state: "ON".into(),
            },
            Row {
                channel: "mode".into(),
                state: "heating".into(),
            },
        ]
    }

    fn same(r: &Row) -> Row {
        Row {
            channel: r.channel.clone(),
            state: r.state.clone(),
        }
    }

    #[test]
    fn plain_emits_one_line_per_item() {
        let out = render_list(OutputFormat::Plain, &rows(), same, |r| {
            format!("{}={}", r.channel, r.state)
        })
        .unwrap();
        assert_eq!(out, "power=ON\nmode=heating");
    }

    #[test]
    fn json_compact_is_single_line() {
        let out = render_list(OutputFormat::JsonCompact, &rows(), same, |_| String::new()).unwrap();
        assert_eq!(
            out,
            r#"[{"channel":"power","state":"ON"},{"channel":"mode","state":"heating"}]"#
        );
    }

    #[test]
    fn table_has_headers() {
        let out = render_list(OutputFormat::Table, &rows(), same, |_| String::new()).unwrap();
        assert!(out.contains("channel"));
        assert!(out.contains("heating"));
    }

    #[test]
    fn status_is_plain_without_color() {
        assert_eq!(paint_status(&DeviceStatus::Online, false), "ONLINE");
        assert_eq!(paint_state(&ChannelState::Undefined, false), "UNDEF");
    }
}
