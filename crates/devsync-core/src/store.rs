// ── Snapshot store and subscriptions ──
//
// Single-writer, many-reader storage for the last decoded snapshot.
// Readers always see a whole snapshot: writes swap an `Arc`.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;

use crate::model::{ChannelId, DeviceSnapshot};

/// Last-known device snapshot.
pub struct SnapshotStore {
    current: ArcSwapOption<DeviceSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// Current snapshot, if any poll has succeeded.
    pub fn load(&self) -> Option<Arc<DeviceSnapshot>> {
        self.current.load_full()
    }

    /// Replace the snapshot wholesale.
    pub fn replace(&self, snapshot: Arc<DeviceSnapshot>) {
        self.current.store(Some(snapshot));
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The set of channels currently linked by a host.
#[derive(Default)]
pub(crate) struct LinkedChannels {
    ids: Mutex<BTreeSet<ChannelId>>,
}

impl LinkedChannels {
    pub(crate) fn list(&self) -> Vec<ChannelId> {
        self.lock().iter().cloned().collect()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    /// Lock the set. Callers that change it and act on the result hold the
    /// guard for the whole sequence.
    pub(crate) fn lock(&self) -> MutexGuard<'_, BTreeSet<ChannelId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
