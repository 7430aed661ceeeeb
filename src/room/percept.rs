// room/percept.rs - Environment percepts

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Illuminance of the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Illuminance {
    #[display("low")]
    Low,
    #[display("high")]
    High,
}

/// Weather outside the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[display("sunny")]
    Sunny,
    #[display("cloudy")]
    Cloudy,
}

/// A percept value outside its enumeration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value '{value}'")]
pub struct PerceptError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Illuminance {
    type Err = PerceptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Illuminance::Low),
            "high" => Ok(Illuminance::High),
            other => Err(PerceptError {
                kind: "illuminance",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for Weather {
    type Err = PerceptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sunny" => Ok(Weather::Sunny),
            "cloudy" => Ok(Weather::Cloudy),
            other => Err(PerceptError {
                kind: "weather",
                value: other.to_string(),
            }),
        }
    }
}

/// What the room manager last perceived. Unknown until the first
/// notification arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerceivedState {
    pub illuminance: Option<Illuminance>,
    pub weather: Option<Weather>,
}

impl PerceivedState {
    /// Record an illuminance percept.
    ///
    /// Returns true only on a transition into `Low`.
    pub fn update_illuminance(&mut self, value: Illuminance) -> bool {
        let entered_low = value == Illuminance::Low && self.illuminance != Some(Illuminance::Low);
        self.illuminance = Some(value);
        entered_low
    }

    pub fn update_weather(&mut self, value: Weather) {
        self.weather = Some(value);
    }
}
