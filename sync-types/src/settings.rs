//! Local display settings.
//!
//! Settings are persisted next to the counter but never reconciled or
//! published to the peer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{DecodeError, Payload};

const COLOR_FIELD: &str = "color";
const MULTIPLES_FIELD: &str = "incrementMultiples";

/// Theme color for the clicker display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickerColor {
    /// Red (default).
    #[default]
    #[serde(rename = "RedColor")]
    Red,
    /// Orange.
    #[serde(rename = "OrangeColor")]
    Orange,
    /// Yellow.
    #[serde(rename = "YellowColor")]
    Yellow,
    /// Green.
    #[serde(rename = "GreenColor")]
    Green,
    /// Blue.
    #[serde(rename = "BlueColor")]
    Blue,
    /// Purple.
    #[serde(rename = "PurpleColor")]
    Purple,
}

impl ClickerColor {
    /// Every color, in display order.
    pub const ALL: [ClickerColor; 6] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
    ];

    /// The wire name, e.g. `"RedColor"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "RedColor",
            Self::Orange => "OrangeColor",
            Self::Yellow => "YellowColor",
            Self::Green => "GreenColor",
            Self::Blue => "BlueColor",
            Self::Purple => "PurpleColor",
        }
    }
}

impl fmt::Display for ClickerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClickerColor {
    type Err = DecodeError;

    /// Accepts the wire name (`"BlueColor"`) or the short name (`"blue"`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| {
                let wire = c.as_str();
                wire.eq_ignore_ascii_case(s)
                    || wire.trim_end_matches("Color").eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| DecodeError::InvalidField {
                field: COLOR_FIELD,
                reason: format!("unknown color {s:?}"),
            })
    }
}

/// Per-device settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Display color.
    pub color: ClickerColor,
    /// Default multiplier applied to each increment or decrement.
    pub increments_multiples: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: ClickerColor::default(),
            increments_multiples: 1,
        }
    }
}

impl Settings {
    /// Serialize to `{"color": "...", "incrementMultiples": n}`.
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(
            COLOR_FIELD.to_string(),
            Value::from(self.color.as_str()),
        );
        payload.insert(
            MULTIPLES_FIELD.to_string(),
            Value::from(self.increments_multiples),
        );
        payload
    }

    /// Leniently decode from a payload.
    ///
    /// Each field falls back to its default independently when absent or
    /// malformed, so an unknown color never discards a valid multiplier.
    pub fn from_payload(payload: &Payload) -> Self {
        let defaults = Self::default();
        let color = payload
            .get(COLOR_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.color);
        let increments_multiples = payload
            .get(MULTIPLES_FIELD)
            .and_then(Value::as_i64)
            .unwrap_or(defaults.increments_multiples);
        Self {
            color,
            increments_multiples,
        }
    }
}
