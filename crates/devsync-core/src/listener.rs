// ── Host callbacks ──
//
// Downstream interface from an agent into whatever hosts it. Calls are
// made from the agent's tasks and must not block.

use crate::lifecycle::OfflineReason;
use crate::model::{ChannelId, ChannelState};

/// Receives channel states and status changes from a [`DeviceSyncAgent`].
///
/// [`DeviceSyncAgent`]: crate::DeviceSyncAgent
pub trait DeviceListener: Send + Sync {
    /// A linked channel has a (possibly unchanged) state.
    fn publish_state(&self, channel: &ChannelId, state: &ChannelState);

    /// The device became reachable.
    fn set_online(&self);

    /// The device became unreachable or its configuration is invalid.
    fn set_offline(&self, reason: OfflineReason, message: &str);
}
