use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── ChannelId ────────────────────────────────────────────────────────

/// Identifier of a channel exposed by a device (e.g. `power`, `isTemp`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Units ────────────────────────────────────────────────────────────

/// Physical unit attached to a quantity channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    #[strum(to_string = "°C", serialize = "C", serialize = "celsius")]
    Celsius,
    #[strum(to_string = "°F", serialize = "F", serialize = "fahrenheit")]
    Fahrenheit,
    #[strum(to_string = "K", serialize = "kelvin")]
    Kelvin,
    #[strum(to_string = "%", serialize = "percent")]
    Percent,
    #[strum(to_string = "kg", serialize = "kilogram")]
    Kilogram,
    #[strum(to_string = "W", serialize = "watt")]
    Watt,
    #[strum(to_string = "kWh", serialize = "kilowatt_hour")]
    KilowattHour,
}

impl Unit {
    /// Convert `value` from `self` to `to`. `None` if the units are not commensurable.
    pub fn convert(self, value: f64, to: Unit) -> Option<f64> {
        if self == to {
            return Some(value);
        }
        let kelvin = match self {
            Self::Celsius => value + 273.15,
            Self::Fahrenheit => (value - 32.0) * 5.0 / 9.0 + 273.15,
            Self::Kelvin => value,
            _ => return None,
        };
        match to {
            Self::Celsius => Some(kelvin - 273.15),
            Self::Fahrenheit => Some((kelvin - 273.15) * 9.0 / 5.0 + 32.0),
            Self::Kelvin => Some(kelvin),
            _ => None,
        }
    }
}

/// Time unit for duration channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3_600.0,
            Self::Days => 86_400.0,
        }
    }

    pub fn convert(self, value: f64, to: TimeUnit) -> f64 {
        value * self.seconds() / to.seconds()
    }
}

// ── Channel kinds ────────────────────────────────────────────────────

fn default_source_unit() -> TimeUnit {
    TimeUnit::Seconds
}

fn default_precision() -> u8 {
    2
}

/// Semantic type of a channel: decides how a device field is presented
/// and which command values the channel accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelKind {
    /// Boolean field presented as on/off.
    Switch,
    /// Numeric field with a physical unit.
    Quantity { unit: Unit },
    /// Numeric field in device time units, shown in `target` units with
    /// `precision` decimals (e.g. seconds → `"120.00"` minutes).
    Duration {
        #[serde(default = "default_source_unit")]
        source: TimeUnit,
        target: TimeUnit,
        #[serde(default = "default_precision")]
        precision: u8,
    },
    /// Anything else, formatted as text.
    Text,
}

impl ChannelKind {
    /// Human-readable name of the command type this kind accepts.
    pub fn expects(&self) -> &'static str {
        match self {
            Self::Switch => "on/off",
            Self::Quantity { .. } | Self::Duration { .. } => "a number",
            Self::Text => "text",
        }
    }

    /// Short label for listings.
    pub fn label(&self) -> String {
        match self {
            Self::Switch => "switch".into(),
            Self::Quantity { unit } => format!("quantity [{unit}]"),
            Self::Duration { target, .. } => format!("duration [{target}]"),
            Self::Text => "text".into(),
        }
    }
}

/// How one channel is backed by a device field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefinition {
    pub id: ChannelId,
    /// Key in the flattened device state (nested objects joined with `.`).
    pub field: String,
    #[serde(flatten)]
    pub kind: ChannelKind,
    /// Whether commands to this channel are forwarded to the device.
    #[serde(default)]
    pub writable: bool,
    /// A state document without this field is a decode error.
    #[serde(default)]
    pub required: bool,
}

impl ChannelDefinition {
    pub fn new(id: &str, field: &str, kind: ChannelKind) -> Self {
        Self {
            id: ChannelId::from(id),
            field: field.to_owned(),
            kind,
            writable: false,
            required: false,
        }
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

// ── Channel state ────────────────────────────────────────────────────

/// State published for a channel.
///
/// `Undefined` means "no data yet" and is never a stand-in for zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChannelState {
    OnOff(bool),
    Quantity { value: f64, unit: Unit },
    Text(String),
    Undefined,
}

impl ChannelState {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnOff(true) => f.write_str("ON"),
            Self::OnOff(false) => f.write_str("OFF"),
            Self::Quantity { value, unit } => write!(f, "{value} {unit}"),
            Self::Text(text) => f.write_str(text),
            Self::Undefined => f.write_str("UNDEF"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unit_parses_symbols_and_names() {
        assert_eq!("°C".parse::<Unit>().unwrap(), Unit::Celsius);
        assert_eq!("C".parse::<Unit>().unwrap(), Unit::Celsius);
        assert_eq!("fahrenheit".parse::<Unit>().unwrap(), Unit::Fahrenheit);
        assert_eq!(Unit::Celsius.to_string(), "°C");
    }

    #[test]
    fn temperature_conversion() {
        let c = Unit::Fahrenheit.convert(212.0, Unit::Celsius).unwrap();
        assert!((c - 100.0).abs() < 1e-9);
        assert!(Unit::Celsius.convert(20.0, Unit::Watt).is_none());
        assert_eq!(Unit::Watt.convert(5.0, Unit::Watt), Some(5.0));
    }

    #[test]
    fn time_conversion() {
        assert!((TimeUnit::Seconds.convert(7200.0, TimeUnit::Minutes) - 120.0).abs() < 1e-9);
        assert!((TimeUnit::Hours.convert(1.5, TimeUnit::Seconds) - 5400.0).abs() < 1e-9);
    }

    #[test]
    fn definition_deserializes_from_flat_table() {
        let def: ChannelDefinition = serde_json::from_value(serde_json::json!({
            "id": "cleaningIn",
            "field": "cleaning_in",
            "type": "duration",
            "target": "minutes"
        }))
        .unwrap();

        assert_eq!(
            def.kind,
            ChannelKind::Duration {
                source: TimeUnit::Seconds,
                target: TimeUnit::Minutes,
                precision: 2,
            }
        );
        assert!(!def.writable);
    }

    #[test]
    fn state_display() {
        assert_eq!(ChannelState::OnOff(true).to_string(), "ON");
        assert_eq!(
            ChannelState::Quantity {
                value: 21.5,
                unit: Unit::Celsius
            }
            .to_string(),
            "21.5 °C"
        );
        assert_eq!(ChannelState::Undefined.to_string(), "UNDEF");
    }
}
