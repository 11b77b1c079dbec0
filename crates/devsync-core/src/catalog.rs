// ── Channel catalog ──
//
// The table that ties channel ids to device fields and kinds. A catalog
// is fixed for the lifetime of an agent.

use std::collections::HashSet;

use crate::config::ConfigField;
use crate::error::CoreError;
use crate::mapper::map_channel;
use crate::model::{
    ChannelDefinition, ChannelId, ChannelKind, ChannelState, DeviceSnapshot, TimeUnit, Unit,
};

/// Name of the built-in pellet-stove catalog.
pub const PELLET_STOVE: &str = "pellet-stove";

/// Ordered set of channel definitions, unique by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCatalog {
    name: String,
    channels: Vec<ChannelDefinition>,
}

impl ChannelCatalog {
    /// Build a catalog, rejecting duplicate ids and empty field names.
    pub fn new(
        name: impl Into<String>,
        channels: Vec<ChannelDefinition>,
    ) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for def in &channels {
            if def.id.as_str().is_empty() || def.field.is_empty() {
                return Err(CoreError::config(
                    ConfigField::Channels,
                    "channel id and field must not be empty",
                ));
            }
            if !seen.insert(def.id.as_str()) {
                return Err(CoreError::config(
                    ConfigField::Channels,
                    format!("duplicate channel id '{}'", def.id),
                ));
            }
        }
        Ok(Self {
            name: name.into(),
            channels,
        })
    }

    /// Built-in catalog by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            PELLET_STOVE => Some(Self::pellet_stove()),
            _ => None,
        }
    }

    /// Channels of a Haas+Sohn pellet stove (`/status.cgi` state document).
    pub fn pellet_stove() -> Self {
        let celsius = ChannelKind::Quantity {
            unit: Unit::Celsius,
        };
        Self {
            name: PELLET_STOVE.into(),
            channels: vec![
                ChannelDefinition::new("isTemp", "is_temp", celsius.clone()).required(),
                ChannelDefinition::new("spTemp", "sp_temp", celsius).writable(),
                ChannelDefinition::new("mode", "mode", ChannelKind::Text),
                ChannelDefinition::new("power", "prg", ChannelKind::Switch)
                    .writable()
                    .required(),
                ChannelDefinition::new("ecoMode", "eco_mode", ChannelKind::Switch).writable(),
                ChannelDefinition::new(
                    "cleaningIn",
                    "cleaning_in",
                    ChannelKind::Duration {
                        source: TimeUnit::Seconds,
                        target: TimeUnit::Minutes,
                        precision: 2,
                    },
                ),
                ChannelDefinition::new("consumption", "consumption", ChannelKind::Text),
                ChannelDefinition::new("ignitions", "ignitions", ChannelKind::Text),
                ChannelDefinition::new("maintenanceIn", "maintenance_in", ChannelKind::Text),
                ChannelDefinition::new("onTime", "on_time", ChannelKind::Text),
            ],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, id: &ChannelId) -> Option<&ChannelDefinition> {
        self.channels.iter().find(|d| &d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelDefinition> {
        self.channels.iter()
    }

    pub fn ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|d| d.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Fields every decoded state document must contain.
    pub fn required_fields(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|d| d.required)
            .map(|d| d.field.as_str())
            .collect()
    }

    /// Map a channel against a snapshot. Unknown channels are `Undefined`.
    pub fn map(&self, snapshot: Option<&DeviceSnapshot>, id: &ChannelId) -> ChannelState {
        self.get(id)
            .map_or(ChannelState::Undefined, |def| map_channel(snapshot, def))
    }
}

impl Default for ChannelCatalog {
    fn default() -> Self {
        Self::pellet_stove()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pellet_stove_has_expected_channels() {
        let catalog = ChannelCatalog::pellet_stove();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.get(&"power".into()).unwrap().field, "prg");
        assert!(catalog.get(&"spTemp".into()).unwrap().writable);
        assert!(!catalog.get(&"mode".into()).unwrap().writable);
        assert_eq!(catalog.required_fields(), vec!["is_temp", "prg"]);
    }

    #[test]
    fn builtin_lookup() {
        assert!(ChannelCatalog::builtin("pellet-stove").is_some());
        assert!(ChannelCatalog::builtin("toaster").is_none());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = ChannelCatalog::new(
            "custom",
            vec![
                ChannelDefinition::new("a", "x", ChannelKind::Text),
                ChannelDefinition::new("a", "y", ChannelKind::Switch),
            ],
        )
        .unwrap_err();
        assert_eq!(err.failed_fields(), vec![ConfigField::Channels]);
    }

    #[test]
    fn unknown_channel_maps_to_undefined() {
        let catalog = ChannelCatalog::pellet_stove();
        assert!(catalog.map(None, &"nope".into()).is_undefined());
    }
}
