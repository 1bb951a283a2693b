//! Control commands and their typed values.

use serde::Serialize;
use std::fmt;

/// A control command destined for the device.
///
/// Created from an inbound bus message, consumed once by a single API
/// dispatch call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Attribute name, taken from the trailing topic segment
    pub name: String,
    /// Typed value, coerced from the raw payload text
    pub value: CommandValue,
}

impl Command {
    /// Build a command from a name and the raw payload text.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: &str) -> Self {
        Self {
            name: name.into(),
            value: CommandValue::coerce(payload),
        }
    }
}

/// Typed command value.
///
/// The device firmware expects numeric attributes as JSON integers, so a
/// digits-only payload is sent as an integer and anything else as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandValue {
    /// Numeric attribute value
    Integer(i64),
    /// String attribute value
    Text(String),
}

impl CommandValue {
    /// Coerce a raw text payload into a typed value.
    ///
    /// A non-empty payload consisting only of ASCII digits parses as an
    /// integer; everything else, including payloads that overflow `i64`,
    /// stays text.
    #[must_use]
    pub fn coerce(payload: &str) -> Self {
        if !payload.is_empty() && payload.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = payload.parse::<i64>() {
                return Self::Integer(n);
            }
        }
        Self::Text(payload.to_string())
    }
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digits_coerce_to_integer() {
        assert_eq!(CommandValue::coerce("1"), CommandValue::Integer(1));
        assert_eq!(CommandValue::coerce("0"), CommandValue::Integer(0));
        assert_eq!(CommandValue::coerce("40"), CommandValue::Integer(40));
    }

    #[test]
    fn text_stays_text() {
        assert_eq!(
            CommandValue::coerce("eco"),
            CommandValue::Text("eco".to_string())
        );
        // Signs and decimals are not digits-only
        assert_eq!(
            CommandValue::coerce("-1"),
            CommandValue::Text("-1".to_string())
        );
        assert_eq!(
            CommandValue::coerce("1.5"),
            CommandValue::Text("1.5".to_string())
        );
    }

    #[test]
    fn empty_payload_stays_text() {
        assert_eq!(CommandValue::coerce(""), CommandValue::Text(String::new()));
    }

    #[test]
    fn overflowing_digits_stay_text() {
        let huge = "99999999999999999999999999";
        assert_eq!(
            CommandValue::coerce(huge),
            CommandValue::Text(huge.to_string())
        );
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(
            serde_json::to_value(CommandValue::Integer(1)).unwrap(),
            json!(1)
        );
        assert_eq!(
            serde_json::to_value(CommandValue::Text("eco".to_string())).unwrap(),
            json!("eco")
        );
    }

    #[test]
    fn command_from_payload() {
        let command = Command::new("power", "1");
        assert_eq!(command.name, "power");
        assert_eq!(command.value, CommandValue::Integer(1));
    }
}
