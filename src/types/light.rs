//! Traffic light types

use serde::{Deserialize, Serialize};

use super::Point3;

/// Discrete traffic light color state.
///
/// Wire codes follow the simulator's light message: RED=0, YELLOW=1,
/// GREEN=2, UNKNOWN=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightState {
    Red,
    Yellow,
    Green,
    #[default]
    Unknown,
}

impl LightState {
    pub const fn code(self) -> u8 {
        match self {
            LightState::Red => 0,
            LightState::Yellow => 1,
            LightState::Green => 2,
            LightState::Unknown => 4,
        }
    }

    /// Decode a wire code; anything unrecognised is `Unknown`.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => LightState::Red,
            1 => LightState::Yellow,
            2 => LightState::Green,
            _ => LightState::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LightState::Red => "RED",
            LightState::Yellow => "YELLOW",
            LightState::Green => "GREEN",
            LightState::Unknown => "UNKNOWN",
        }
    }

    pub const fn requires_stop(self) -> bool {
        matches!(self, LightState::Red)
    }
}

impl std::fmt::Display for LightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A traffic light: position plus ground-truth or last-observed state.
///
/// The map only carries positions; `state` is filled in by the simulator's
/// ground-truth topic and is informational.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrafficLight {
    pub position: Point3,
    #[serde(default)]
    pub state: LightState,
}

impl TrafficLight {
    pub const fn at(position: Point3) -> Self {
        Self { position, state: LightState::Unknown }
    }
}
