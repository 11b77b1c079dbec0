// ── Command dispatch ──
//
// Type-checks a command against its channel and builds the single-field
// write the device expects. Sending happens in the agent, which owns the
// client and the execution slot.

use serde::Serialize;
use serde_json::{Number, Value};
use tracing::debug;

use crate::catalog::ChannelCatalog;
use crate::error::CoreError;
use crate::model::{ChannelDefinition, ChannelId, ChannelKind, CommandValue};

/// What happened to a submitted command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Written to the device as `{"<field>": <value>}`.
    Sent { field: String, value: Value },
    /// Unknown or read-only channel; nothing was sent.
    Ignored,
}

/// A validated write for one device field.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub field: String,
    pub value: Value,
}

/// Resolve `command` for `channel`.
///
/// `Ok(None)` for channels the catalog does not know or that are not
/// writable; `Err(TypeMismatch)` when the value does not fit the channel.
pub fn build_write(
    catalog: &ChannelCatalog,
    channel: &ChannelId,
    command: &CommandValue,
) -> Result<Option<WriteRequest>, CoreError> {
    let Some(def) = catalog.get(channel).filter(|d| d.writable) else {
        debug!(%channel, "ignoring command for unknown or read-only channel");
        return Ok(None);
    };

    let value = encode(def, command)?;
    Ok(Some(WriteRequest {
        field: def.field.clone(),
        value,
    }))
}

fn encode(def: &ChannelDefinition, command: &CommandValue) -> Result<Value, CoreError> {
    let mismatch = || CoreError::TypeMismatch {
        channel: def.id.to_string(),
        expected: def.kind.expects(),
        got: command.type_name(),
    };

    match (&def.kind, command) {
        (ChannelKind::Switch, CommandValue::OnOff(on)) => Ok(Value::Bool(*on)),

        (ChannelKind::Quantity { unit }, CommandValue::Number { value, unit: given }) => {
            let value = match given {
                None => *value,
                Some(from) => from.convert(*value, *unit).ok_or_else(mismatch)?,
            };
            finite_number(value).ok_or_else(mismatch)
        }

        (
            ChannelKind::Duration { source, target, .. },
            CommandValue::Number { value, unit: None },
        ) => finite_number(target.convert(*value, *source)).ok_or_else(mismatch),

        (ChannelKind::Text, CommandValue::Text(text)) => Ok(Value::String(text.clone())),

        _ => Err(mismatch()),
    }
}

fn finite_number(value: f64) -> Option<Value> {
    Number::from_f64(value).map(Value::Number)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{TimeUnit, Unit};

    fn write(id: &str, command: CommandValue) -> Result<Option<WriteRequest>, CoreError> {
        build_write(&ChannelCatalog::pellet_stove(), &ChannelId::from(id), &command)
    }

    #[test]
    fn power_on_writes_prg_true() {
        let req = write("power", CommandValue::OnOff(true)).unwrap().unwrap();
        assert_eq!(req.field, "prg");
        assert_eq!(req.value, json!(true));
    }

    #[test]
    fn setpoint_accepts_plain_numbers() {
        let req = write("spTemp", CommandValue::number(21.5)).unwrap().unwrap();
        assert_eq!(req.field, "sp_temp");
        assert_eq!(req.value, json!(21.5));
    }

    #[test]
    fn setpoint_converts_fahrenheit() {
        let req = write("spTemp", CommandValue::quantity(68.0, Unit::Fahrenheit))
            .unwrap()
            .unwrap();
        let c = req.value.as_f64().unwrap();
        assert!((c - 20.0).abs() < 1e-9);
    }

    #[test]
    fn switch_rejects_non_boolean() {
        let err = write("power", CommandValue::number(1.0)).unwrap_err();
        match err {
            CoreError::TypeMismatch {
                channel, expected, ..
            } => {
                assert_eq!(channel, "power");
                assert_eq!(expected, "on/off");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
        assert!(write("ecoMode", CommandValue::Text("on".into())).is_err());
    }

    #[test]
    fn quantity_rejects_incompatible_unit() {
        assert!(matches!(
            write("spTemp", CommandValue::quantity(5.0, Unit::Watt)),
            Err(CoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn unknown_and_read_only_channels_are_ignored() {
        assert_eq!(write("nope", CommandValue::OnOff(true)).unwrap(), None);
        assert_eq!(write("isTemp", CommandValue::number(3.0)).unwrap(), None);
        // Type is not checked for ignored channels.
        assert_eq!(write("mode", CommandValue::OnOff(true)).unwrap(), None);
    }

    #[test]
    fn writable_duration_converts_back_to_device_units() {
        let catalog = ChannelCatalog::new(
            "custom",
            vec![
                ChannelDefinition::new(
                    "timer",
                    "timer_s",
                    ChannelKind::Duration {
                        source: TimeUnit::Seconds,
                        target: TimeUnit::Minutes,
                        precision: 0,
                    },
                )
                .writable(),
            ],
        )
        .unwrap();

        let req = build_write(&catalog, &"timer".into(), &CommandValue::number(2.0))
            .unwrap()
            .unwrap();
        assert_eq!(req.value, json!(120.0));
    }
}
