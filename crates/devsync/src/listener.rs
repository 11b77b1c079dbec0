//! Host-side listeners: what the CLI does with agent callbacks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use devsync_core::{ChannelId, ChannelState, DeviceListener, DeviceStatus, OfflineReason};

use crate::cli::OutputFormat;
use crate::output;

/// Sends callbacks to the log only. Used by one-shot commands.
pub struct LogListener;

impl DeviceListener for LogListener {
    fn publish_state(&self, channel: &ChannelId, state: &ChannelState) {
        debug!(%channel, %state, "channel state");
    }

    fn set_online(&self) {
        info!("device online");
    }

    fn set_offline(&self, reason: OfflineReason, message: &str) {
        warn!(%reason, message, "device offline");
    }
}

// ── Watch printer ────────────────────────────────────────────────────

#[derive(Serialize)]
struct Update<'a> {
    time: String,
    channel: &'a ChannelId,
    state: &'a ChannelState,
}

/// Prints channel changes as they arrive and status changes to stderr.
///
/// A channel whose first state is undefined is not printed until it has
/// a value.
pub struct WatchPrinter {
    format: OutputFormat,
    color: bool,
    quiet: bool,
    limit: Option<usize>,
    last: Mutex<HashMap<ChannelId, ChannelState>>,
    printed: AtomicUsize,
    done: Notify,
}

impl WatchPrinter {
    pub fn new(format: OutputFormat, color: bool, quiet: bool, limit: Option<usize>) -> Self {
        Self {
            format,
            color,
            quiet,
            limit,
            last: Mutex::new(HashMap::new()),
            printed: AtomicUsize::new(0),
            done: Notify::new(),
        }
    }

    /// Resolves once `limit` updates have been printed; never without a limit.
    pub async fn finished(&self) {
        match self.limit {
            Some(0) => {}
            Some(_) => self.done.notified().await,
            None => std::future::pending().await,
        }
    }

    fn is_change(&self, channel: &ChannelId, state: &ChannelState) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match last.get(channel) {
            Some(prev) if prev == state => false,
            None if state.is_undefined() => false,
            _ => {
                last.insert(channel.clone(), state.clone());
                true
            }
        }
    }

    fn format_update(
        &self,
        channel: &ChannelId,
        state: &ChannelState,
    ) -> Result<String, serde_json::Error> {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        Ok(match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => {
                let update = Update {
                    time,
                    channel,
                    state,
                };
                serde_json::to_string(&update)?
            }
            OutputFormat::Plain => format!("{channel}={state}"),
            OutputFormat::Table => format!(
                "{time}  {channel:<14} {}",
                output::paint_state(state, self.color)
            ),
        })
    }
}

impl DeviceListener for WatchPrinter {
    fn publish_state(&self, channel: &ChannelId, state: &ChannelState) {
        if !self.is_change(channel, state) {
            return;
        }

        match self.format_update(channel, state) {
            Ok(line) => output::print_output(&line, self.quiet),
            Err(e) => {
                warn!(%channel, error = %e, "could not format channel update");
                return;
            }
        }

        let printed = self.printed.fetch_add(1, Ordering::SeqCst) + 1;
        if self.limit.is_some_and(|limit| printed >= limit) {
            self.done.notify_one();
        }
    }

    fn set_online(&self) {
        if !self.quiet {
            eprintln!("{}", output::paint_status(&DeviceStatus::Online, self.color));
        }
    }

    fn set_offline(&self, reason: OfflineReason, message: &str) {
        if !self.quiet {
            let status = DeviceStatus::Offline {
                reason,
                message: message.to_owned(),
            };
            eprintln!("{}", output::paint_status(&status, self.color));
        }
    }
}
