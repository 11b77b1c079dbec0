// devsync-core: Periodic device-state synchronizer between a device's
// HTTP+JSON API and a host's channel/state abstraction.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod listener;
pub mod mapper;
pub mod model;
pub mod scheduler;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use agent::DeviceSyncAgent;
pub use catalog::ChannelCatalog;
pub use config::{
    ConfigField, ConfigIssue, CredentialFormat, DeviceAddress, DeviceConfig, DeviceSettings,
    TlsVerification,
};
pub use dispatch::DispatchOutcome;
pub use error::CoreError;
pub use lifecycle::{DeviceStatus, OfflineReason};
pub use listener::DeviceListener;
pub use mapper::map_channel;
pub use store::SnapshotStore;

pub use devsync_api::{CredentialPlacement, DEFAULT_CREDENTIAL_HEADER, WriteMethod};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ChannelDefinition, ChannelId, ChannelKind, ChannelState, CommandValue, DeviceSnapshot,
    FieldValue, TimeUnit, Unit,
};
