// ── Device sync agent ──
//
// Lifecycle management for one device: validation, the initial fetch,
// fixed-delay polling gated on linked channels, channel propagation,
// and command dispatch. Polls and commands share one execution slot
// (the mutex around the device client), so they never overlap.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use devsync_api::{DeviceClient, TlsMode, TransportConfig};

use crate::catalog::ChannelCatalog;
use crate::config::{DeviceConfig, DeviceSettings, TlsVerification};
use crate::dispatch::{self, DispatchOutcome};
use crate::error::CoreError;
use crate::lifecycle::{DeviceStatus, OfflineReason};
use crate::listener::DeviceListener;
use crate::model::{ChannelId, ChannelState, CommandValue, DeviceSnapshot};
use crate::scheduler::Poller;
use crate::store::{LinkedChannels, SnapshotStore};

/// Synchronizes one device with its host.
///
/// Cheaply cloneable via `Arc<AgentInner>`. Host-facing methods mirror the
/// host lifecycle: [`initialize`](Self::initialize),
/// [`channel_linked`](Self::channel_linked),
/// [`channel_unlinked`](Self::channel_unlinked),
/// [`handle_command`](Self::handle_command) and [`dispose`](Self::dispose).
/// Must be driven from within a tokio runtime.
#[derive(Clone)]
pub struct DeviceSyncAgent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    settings: DeviceSettings,
    catalog: ChannelCatalog,
    listener: Arc<dyn DeviceListener>,
    config: OnceLock<DeviceConfig>,
    /// Execution slot: holding this lock is the right to talk to the device.
    device: Mutex<Option<DeviceClient>>,
    store: SnapshotStore,
    linked: LinkedChannels,
    status: watch::Sender<DeviceStatus>,
    poller: Poller,
    cancel: CancellationToken,
    disposed: AtomicBool,
    failures: AtomicU32,
}

impl DeviceSyncAgent {
    /// Create an agent. Does NOT validate or connect -- call
    /// [`initialize()`](Self::initialize).
    pub fn new(
        settings: DeviceSettings,
        catalog: ChannelCatalog,
        listener: Arc<dyn DeviceListener>,
    ) -> Self {
        let (status, _) = watch::channel(DeviceStatus::Unconfigured);

        Self {
            inner: Arc::new(AgentInner {
                settings,
                catalog,
                listener,
                config: OnceLock::new(),
                device: Mutex::new(None),
                store: SnapshotStore::new(),
                linked: LinkedChannels::default(),
                status,
                poller: Poller::new(),
                cancel: CancellationToken::new(),
                disposed: AtomicBool::new(false),
                failures: AtomicU32::new(0),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Validate the settings, build the device client, and run the initial fetch.
    ///
    /// Returns the resulting status. Configuration problems are returned as
    /// errors (status `Offline(ConfigurationError)`); a failed initial fetch
    /// is not an error (status `Offline(CommunicationError)`, polling will
    /// retry). Calling this again after the first time has no effect.
    pub async fn initialize(&self) -> Result<DeviceStatus, CoreError> {
        self.ensure_live()?;

        let started = self.inner.status.send_if_modified(|status| {
            if *status == DeviceStatus::Unconfigured {
                *status = DeviceStatus::Validating;
                true
            } else {
                false
            }
        });
        if !started {
            debug!("initialize called twice; ignoring");
            return Ok(self.status());
        }
        info!("validating device configuration");

        let (config, client) = match self.configure() {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "device configuration rejected");
                self.transition(DeviceStatus::Offline {
                    reason: OfflineReason::ConfigurationError,
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        info!(address = %config.address, interval = ?config.poll_interval, "device configured");
        let interval = config.poll_interval;
        let _ = self.inner.config.set(config);
        *self.inner.device.lock().await = Some(client);

        // Initial fetch; the outcome decides Online vs Offline.
        if let Err(CoreError::Disposed) = self.poll_cycle().await {
            return Err(CoreError::Disposed);
        }

        // The initial fetch stands in for the first scheduled poll.
        self.sync_polling(&self.inner.linked.lock(), interval);
        Ok(self.status())
    }

    /// Dispose of the agent: cancel polling, abandon in-flight requests,
    /// and move to `Disposed`. Later calls fail with [`CoreError::Disposed`].
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.cancel.cancel();
        self.inner.poller.shutdown().await;
        *self.inner.device.lock().await = None;
        self.inner.linked.clear();

        let _ = self.inner.status.send_replace(DeviceStatus::Disposed);
        info!("device agent disposed");
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// A host started observing `channel`.
    ///
    /// Publishes the channel's current state right away and starts polling
    /// if this is the first linked channel.
    pub fn channel_linked(&self, channel: ChannelId) -> Result<(), CoreError> {
        self.ensure_live()?;

        let newly_linked = {
            let mut linked = self.inner.linked.lock();
            let newly_linked = linked.insert(channel.clone());
            self.sync_polling(&linked, Duration::ZERO);
            newly_linked
        };

        if newly_linked {
            debug!(%channel, "channel linked");
            let snapshot = self.inner.store.load();
            let state = self.inner.catalog.map(snapshot.as_deref(), &channel);
            self.inner.listener.publish_state(&channel, &state);
        }
        Ok(())
    }

    /// A host stopped observing `channel`. Polling stops with the last one.
    pub fn channel_unlinked(&self, channel: &ChannelId) -> Result<(), CoreError> {
        self.ensure_live()?;

        let mut linked = self.inner.linked.lock();
        if linked.remove(channel) {
            debug!(%channel, "channel unlinked");
        }
        self.sync_polling(&linked, Duration::ZERO);
        Ok(())
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Poll the device once, outside the regular schedule.
    pub async fn poll(&self) -> Result<Arc<DeviceSnapshot>, CoreError> {
        self.ensure_live()?;
        self.poll_cycle().await
    }

    /// One fetch plus status transition and channel propagation,
    /// serialized through the execution slot.
    async fn poll_cycle(&self) -> Result<Arc<DeviceSnapshot>, CoreError> {
        let guard = self.inner.device.lock().await;
        let client = guard.as_ref().ok_or_else(|| self.not_ready())?;

        let result = self.fetch(client).await;
        self.record_poll(&result);
        result
    }

    /// Fetch and decode; on success the store is swapped. Must hold the slot.
    async fn fetch(&self, client: &DeviceClient) -> Result<Arc<DeviceSnapshot>, CoreError> {
        let state = tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => return Err(CoreError::Disposed),
            state = client.fetch_state() => state?,
        };

        // A response that raced with dispose() is discarded.
        if self.is_disposed() {
            return Err(CoreError::Disposed);
        }

        let required = self.inner.catalog.required_fields();
        let snapshot = Arc::new(DeviceSnapshot::decode(&state, &required, Utc::now())?);
        self.inner.store.replace(Arc::clone(&snapshot));
        debug!(fields = snapshot.len(), "device snapshot updated");
        Ok(snapshot)
    }

    fn record_poll(&self, result: &Result<Arc<DeviceSnapshot>, CoreError>) {
        match result {
            Err(CoreError::Disposed) => return,
            Ok(_) => {
                self.inner.failures.store(0, Ordering::SeqCst);
                self.transition(DeviceStatus::Online);
            }
            Err(e) => {
                let failures = self.inner.failures.fetch_add(1, Ordering::SeqCst) + 1;
                let threshold = self
                    .inner
                    .config
                    .get()
                    .map_or(1, |c| c.offline_after_failures);
                let initial = *self.inner.status.borrow() == DeviceStatus::Validating;
                let retryable = e.is_retryable();
                warn!(error = %e, failures, retryable, "device poll failed");

                if initial || !retryable || failures >= threshold {
                    self.transition(DeviceStatus::Offline {
                        reason: OfflineReason::CommunicationError,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.propagate();
    }

    /// Publish every linked channel from the current snapshot.
    fn propagate(&self) {
        let snapshot = self.inner.store.load();
        for channel in self.inner.linked.list() {
            let state = self.inner.catalog.map(snapshot.as_deref(), &channel);
            self.inner.listener.publish_state(&channel, &state);
        }
    }

    /// Start or stop the poller to match the subscription set.
    ///
    /// Takes the locked set so that a concurrent link and unlink cannot
    /// interleave between the emptiness check and the start/stop.
    fn sync_polling(&self, linked: &BTreeSet<ChannelId>, initial_delay: Duration) {
        if !self.status().is_running() {
            return;
        }
        let Some(config) = self.inner.config.get() else {
            return;
        };

        if linked.is_empty() {
            if self.inner.poller.stop() {
                info!("no linked channels; polling stopped");
            }
            return;
        }

        let agent = self.clone();
        let started = self
            .inner
            .poller
            .start(&self.inner.cancel, initial_delay, config.poll_interval, move || {
                let agent = agent.clone();
                async move {
                    if let Err(e) = agent.poll_cycle().await {
                        debug!(error = %e, "scheduled poll did not complete");
                    }
                }
            });
        if started {
            info!(interval = ?config.poll_interval, "polling started");
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Forward a command to the device.
    ///
    /// Unknown or read-only channels yield [`DispatchOutcome::Ignored`].
    /// A value of the wrong type yields [`CoreError::TypeMismatch`] without
    /// contacting the device. After a successful write the device is polled
    /// immediately.
    pub async fn handle_command(
        &self,
        channel: &ChannelId,
        command: CommandValue,
    ) -> Result<DispatchOutcome, CoreError> {
        self.ensure_live()?;

        let write = match dispatch::build_write(&self.inner.catalog, channel, &command) {
            Ok(Some(write)) => write,
            Ok(None) => return Ok(DispatchOutcome::Ignored),
            Err(e) => {
                warn!(%channel, error = %e, "command rejected");
                return Err(e);
            }
        };

        let guard = self.inner.device.lock().await;
        let client = guard.as_ref().ok_or_else(|| self.not_ready())?;

        debug!(%channel, field = %write.field, value = %write.value, "sending command");
        let sent = tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Err(CoreError::Disposed),
            res = client.write_property(&write.field, write.value.clone()) => res.map_err(CoreError::from),
        };

        match sent {
            Err(CoreError::Disposed) => Err(CoreError::Disposed),
            Err(e) => {
                warn!(%channel, error = %e, "command failed");
                self.transition(DeviceStatus::Offline {
                    reason: OfflineReason::CommunicationError,
                    message: e.to_string(),
                });
                Err(e)
            }
            Ok(()) => {
                self.inner.failures.store(0, Ordering::SeqCst);
                self.transition(DeviceStatus::Online);

                let refreshed = self.fetch(client).await;
                self.record_poll(&refreshed);

                Ok(DispatchOutcome::Sent {
                    field: write.field,
                    value: write.value,
                })
            }
        }
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn status(&self) -> DeviceStatus {
        self.inner.status.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.inner.status.subscribe()
    }

    pub fn snapshot(&self) -> Option<Arc<DeviceSnapshot>> {
        self.inner.store.load()
    }

    /// Current state of `channel`, mapped from the last snapshot.
    pub fn channel_state(&self, channel: &ChannelId) -> ChannelState {
        let snapshot = self.inner.store.load();
        self.inner.catalog.map(snapshot.as_deref(), channel)
    }

    pub fn catalog(&self) -> &ChannelCatalog {
        &self.inner.catalog
    }

    pub fn linked_channels(&self) -> Vec<ChannelId> {
        self.inner.linked.list()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_running()
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn configure(&self) -> Result<(DeviceConfig, DeviceClient), CoreError> {
        let config = self.inner.settings.validate()?;
        let transport = build_transport(&config);
        let client = DeviceClient::new(config.base_url()?, config.credential.clone(), &transport)?
            .with_state_path(config.state_path.clone())
            .with_credential_placement(config.credential_placement.clone())
            .with_write_method(config.write_method);
        // Surface a bad state path now rather than on every poll.
        client.state_url()?;
        Ok((config, client))
    }

    /// Apply a status change and notify the listener. No-op when unchanged
    /// or after disposal.
    fn transition(&self, next: DeviceStatus) {
        if self.is_disposed() {
            return;
        }

        let changed = self.inner.status.send_if_modified(|current| {
            if *current == next || !current.can_transition_to(&next) {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if !changed {
            return;
        }

        info!(status = %next, "device status changed");
        match &next {
            DeviceStatus::Online => self.inner.listener.set_online(),
            DeviceStatus::Offline { reason, message } => {
                self.inner.listener.set_offline(*reason, message);
            }
            _ => {}
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<(), CoreError> {
        if self.is_disposed() {
            Err(CoreError::Disposed)
        } else {
            Ok(())
        }
    }

    fn not_ready(&self) -> CoreError {
        if self.is_disposed() {
            CoreError::Disposed
        } else {
            CoreError::NotConfigured
        }
    }
}

/// Build a [`TransportConfig`] from the device configuration.
fn build_transport(config: &DeviceConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
