// room/console.rs - Operator console commands

use std::str::FromStr;

use super::environment::{EnvironmentHandle, EnvironmentState};
use super::percept::{Illuminance, PerceptError, Weather};

/// Console parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{0}' expects a value")]
    MissingValue(&'static str),

    #[error(transparent)]
    InvalidValue(#[from] PerceptError),
}

/// A line typed by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    SetIlluminance(Illuminance),
    SetWeather(Weather),
    Status,
    Quit,
}

impl ConsoleCommand {
    pub const USAGE: &'static str =
        "commands: illuminance <low|high>, weather <sunny|cloudy>, status, quit";

    /// Apply the command to the environment and return the resulting state
    pub fn apply(&self, env: &EnvironmentHandle) -> EnvironmentState {
        match self {
            ConsoleCommand::SetIlluminance(value) => env.set_illuminance(*value),
            ConsoleCommand::SetWeather(value) => env.set_weather(*value),
            ConsoleCommand::Status | ConsoleCommand::Quit => {}
        }
        env.snapshot()
    }
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(ConsoleError::Empty)?;

        match command.to_ascii_lowercase().as_str() {
            "illuminance" | "i" => {
                let value = words.next().ok_or(ConsoleError::MissingValue("illuminance"))?;
                Ok(ConsoleCommand::SetIlluminance(value.parse()?))
            }
            "weather" | "w" => {
                let value = words.next().ok_or(ConsoleError::MissingValue("weather"))?;
                Ok(ConsoleCommand::SetWeather(value.parse()?))
            }
            "status" | "s" => Ok(ConsoleCommand::Status),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }
}
