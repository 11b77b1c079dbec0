// ── State-to-channel mapping ──
//
// Pure conversion from a snapshot field to a channel state. Absent data
// always yields `ChannelState::Undefined`, never a zero value.

use crate::model::{ChannelDefinition, ChannelKind, ChannelState, DeviceSnapshot};

/// Map one channel against the current snapshot (if any).
pub fn map_channel(snapshot: Option<&DeviceSnapshot>, def: &ChannelDefinition) -> ChannelState {
    let Some(value) = snapshot.and_then(|s| s.get(&def.field)) else {
        return ChannelState::Undefined;
    };

    match def.kind {
        ChannelKind::Switch => value
            .as_bool()
            .map_or(ChannelState::Undefined, ChannelState::OnOff),
        ChannelKind::Quantity { unit } => value
            .as_f64()
            .map_or(ChannelState::Undefined, |v| ChannelState::Quantity {
                value: v,
                unit,
            }),
        ChannelKind::Duration {
            source,
            target,
            precision,
        } => value.as_f64().map_or(ChannelState::Undefined, |v| {
            let converted = source.convert(v, target);
            ChannelState::Text(format!("{converted:.prec$}", prec = usize::from(precision)))
        }),
        ChannelKind::Text => ChannelState::Text(value.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::catalog::ChannelCatalog;
    use crate::model::{ChannelId, Unit};

    fn snapshot(value: Value) -> DeviceSnapshot {
        let Value::Object(map) = value else {
            unreachable!()
        };
        DeviceSnapshot::decode(&map, &[], Utc::now()).unwrap()
    }

    fn map(snap: &DeviceSnapshot, id: &str) -> ChannelState {
        ChannelCatalog::pellet_stove().map(Some(snap), &ChannelId::from(id))
    }

    #[test]
    fn booleans_become_on_off() {
        let snap = snapshot(json!({ "prg": true, "eco_mode": false }));
        assert_eq!(map(&snap, "power"), ChannelState::OnOff(true));
        assert_eq!(map(&snap, "ecoMode"), ChannelState::OnOff(false));
    }

    #[test]
    fn temperatures_carry_units() {
        let snap = snapshot(json!({ "is_temp": "21.5", "sp_temp": 22 }));
        assert_eq!(
            map(&snap, "isTemp"),
            ChannelState::Quantity {
                value: 21.5,
                unit: Unit::Celsius
            }
        );
        assert_eq!(
            map(&snap, "spTemp"),
            ChannelState::Quantity {
                value: 22.0,
                unit: Unit::Celsius
            }
        );
    }

    #[test]
    fn duration_seconds_to_minutes() {
        let snap = snapshot(json!({ "cleaning_in": "7200" }));
        assert_eq!(map(&snap, "cleaningIn"), ChannelState::Text("120.00".into()));

        let snap = snapshot(json!({ "cleaning_in": 90 }));
        assert_eq!(map(&snap, "cleaningIn"), ChannelState::Text("1.50".into()));
    }

    #[test]
    fn text_fields_are_formatted() {
        let snap = snapshot(json!({ "mode": "heating", "ignitions": 1520 }));
        assert_eq!(map(&snap, "mode"), ChannelState::Text("heating".into()));
        assert_eq!(map(&snap, "ignitions"), ChannelState::Text("1520".into()));
    }

    #[test]
    fn missing_field_is_undefined_not_zero() {
        let snap = snapshot(json!({ "mode": "off" }));
        for id in ["power", "isTemp", "cleaningIn", "consumption"] {
            assert_eq!(map(&snap, id), ChannelState::Undefined, "{id}");
        }
    }

    #[test]
    fn no_snapshot_is_undefined() {
        let catalog = ChannelCatalog::pellet_stove();
        for def in catalog.iter() {
            assert_eq!(map_channel(None, def), ChannelState::Undefined);
        }
    }

    #[test]
    fn unconvertible_values_are_undefined() {
        let snap = snapshot(json!({ "is_temp": "n/a", "prg": "maybe" }));
        assert_eq!(map(&snap, "isTemp"), ChannelState::Undefined);
        assert_eq!(map(&snap, "power"), ChannelState::Undefined);
    }
}
