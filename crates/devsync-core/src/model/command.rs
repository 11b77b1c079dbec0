use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::channel::Unit;

/// A typed value submitted for a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommandValue {
    OnOff(bool),
    Number { value: f64, unit: Option<Unit> },
    Text(String),
}

impl CommandValue {
    pub fn number(value: f64) -> Self {
        Self::Number { value, unit: None }
    }

    pub fn quantity(value: f64, unit: Unit) -> Self {
        Self::Number {
            value,
            unit: Some(unit),
        }
    }

    /// Name of the runtime type, for mismatch diagnostics.
    pub fn type_name(&self) -> String {
        match self {
            Self::OnOff(_) => "on/off".into(),
            Self::Number { unit: None, .. } => "a number".into(),
            Self::Number { unit: Some(u), .. } => format!("a quantity in {u}"),
            Self::Text(_) => "text".into(),
        }
    }
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnOff(true) => f.write_str("ON"),
            Self::OnOff(false) => f.write_str("OFF"),
            Self::Number { value, unit: None } => write!(f, "{value}"),
            Self::Number {
                value,
                unit: Some(unit),
            } => write!(f, "{value} {unit}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Parses user input: `on`/`off`, a number with an optional unit
/// (`21.5`, `21.5 °C`, `70F`), and anything else as text.
impl FromStr for CommandValue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "on" | "true" => return Ok(Self::OnOff(true)),
            "off" | "false" => return Ok(Self::OnOff(false)),
            _ => {}
        }

        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                return Ok(Self::number(value));
            }
        }

        let split = trimmed
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+')))
            .map(|(i, _)| i);
        if let Some(idx) = split.filter(|&i| i > 0) {
            let (num, unit) = trimmed.split_at(idx);
            if let (Ok(value), Ok(unit)) = (num.parse::<f64>(), unit.trim().parse::<Unit>()) {
                return Ok(Self::quantity(value, unit));
            }
        }

        Ok(Self::Text(trimmed.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(s: &str) -> CommandValue {
        s.parse().unwrap()
    }

    #[test]
    fn parses_switch_words() {
        assert_eq!(parse("ON"), CommandValue::OnOff(true));
        assert_eq!(parse("off"), CommandValue::OnOff(false));
    }

    #[test]
    fn parses_numbers_and_quantities() {
        assert_eq!(parse("21.5"), CommandValue::number(21.5));
        assert_eq!(parse("21.5 °C"), CommandValue::quantity(21.5, Unit::Celsius));
        assert_eq!(parse("70F"), CommandValue::quantity(70.0, Unit::Fahrenheit));
    }

    #[test]
    fn falls_back_to_text() {
        assert_eq!(parse("heating"), CommandValue::Text("heating".into()));
        assert_eq!(parse("12 parsecs"), CommandValue::Text("12 parsecs".into()));
        assert_eq!(parse("inf"), CommandValue::Text("inf".into()));
    }
}
