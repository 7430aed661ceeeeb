// config.rs - Simulation configuration

//! Layered configuration for the room simulation.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional TOML (or JSON/YAML) file
//! 3. `ROOM_SIM__*` environment variables, e.g. `ROOM_SIM__MANAGER__PERCEPTION_DELAY_MS=1000`

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::observability::TracingConfig;
use crate::platform::DiscoveryPolicy;
use crate::room::{Illuminance, Weather, RAISE_BLINDS, TURN_ON_LIGHT};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ROOM_SIM";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Scheduler driving each agent actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Interval between scheduling ticks (ms)
    pub tick_ms: u64,
    /// Upper bound of behavior turns per tick
    pub max_turns_per_tick: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            max_turns_per_tick: 64,
        }
    }
}

/// Provider discovery retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub max_attempts: u32,
    pub retry_interval_ms: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        let policy = DiscoveryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            retry_interval_ms: policy.retry_interval_ms,
        }
    }
}

impl DiscoverySettings {
    pub fn policy(&self) -> DiscoveryPolicy {
        DiscoveryPolicy {
            max_attempts: self.max_attempts,
            retry_interval_ms: self.retry_interval_ms,
        }
    }
}

/// Building environment simulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    pub name: String,
    pub initial_illuminance: Illuminance,
    pub initial_weather: Weather,
    /// Interval between percept notifications (ms)
    pub notification_interval_ms: u64,
    /// Interval between status log lines (ms)
    pub status_interval_ms: u64,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            name: "building-environment".into(),
            initial_illuminance: Illuminance::High,
            initial_weather: Weather::Sunny,
            notification_interval_ms: 2000,
            status_interval_ms: 1000,
        }
    }
}

/// Room manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    pub name: String,
    /// Delay before subscribing to percepts (ms)
    pub perception_delay_ms: u64,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            name: "room-manager".into(),
            perception_delay_ms: 5000,
        }
    }
}

/// One device controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub name: String,
    /// Offer proposed for `increase-illuminance`
    pub offer: String,
    /// Illuminance requested once the offer is accepted
    pub target: Illuminance,
}

impl DeviceSettings {
    pub fn lamp() -> Self {
        Self {
            name: "lamp-controller".into(),
            offer: TURN_ON_LIGHT.into(),
            target: Illuminance::High,
        }
    }

    pub fn blinds() -> Self {
        Self {
            name: "blinds-controller".into(),
            offer: RAISE_BLINDS.into(),
            target: Illuminance::High,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub logging: TracingConfig,
    pub scheduler: SchedulerSettings,
    pub discovery: DiscoverySettings,
    pub environment: EnvironmentSettings,
    pub manager: ManagerSettings,
    pub lamp: DeviceSettings,
    pub blinds: DeviceSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            logging: TracingConfig::default(),
            scheduler: SchedulerSettings::default(),
            discovery: DiscoverySettings::default(),
            environment: EnvironmentSettings::default(),
            manager: ManagerSettings::default(),
            lamp: DeviceSettings::lamp(),
            blinds: DeviceSettings::blinds(),
        }
    }
}

impl SimulationConfig {
    /// Load defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Lamp and blinds share a struct with different defaults, so the
        // defaults are a source rather than serde attributes.
        let defaults = config::Config::try_from(&SimulationConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: SimulationConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_ms == 0 {
            return Err(ConfigError::Invalid("scheduler.tick_ms must be positive".into()));
        }
        if self.scheduler.max_turns_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.max_turns_per_tick must be positive".into(),
            ));
        }
        if self.environment.notification_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "environment.notification_interval_ms must be positive".into(),
            ));
        }

        let names = [
            &self.environment.name,
            &self.manager.name,
            &self.lamp.name,
            &self.blinds.name,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid("agent names must not be empty".into()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ConfigError::Invalid(format!("duplicate agent name '{name}'")));
            }
        }

        if self.lamp.offer.is_empty() || self.blinds.offer.is_empty() {
            return Err(ConfigError::Invalid("device offers must not be empty".into()));
        }
        Ok(())
    }
}
