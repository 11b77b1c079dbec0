// ── Domain model ──
//
// Channel identities and kinds, decoded device snapshots, and the
// typed command values hosts submit.

pub mod channel;
pub mod command;
pub mod snapshot;

pub use channel::{ChannelDefinition, ChannelId, ChannelKind, ChannelState, TimeUnit, Unit};
pub use command::CommandValue;
pub use snapshot::{DeviceSnapshot, FieldValue};
