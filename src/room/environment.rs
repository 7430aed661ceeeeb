// room/environment.rs - Building environment simulator

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use super::percept::{Illuminance, Weather};
use super::{AgentRole, READ_ILLUMINANCE, READ_WEATHER, SET_ILLUMINANCE};
use crate::agent::{Agent, AgentContext};
use crate::behavior::{BehaviorError, TickerBehavior};
use crate::config::EnvironmentSettings;
use crate::observability::record_environment;
use crate::platform::PublishServices;
use crate::protocol::{
    Actuator, RequestResponder, SubscriberRegistry, SubscriptionResponder, TopicSource,
};

/// Current illuminance and weather
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentState {
    pub illuminance: Illuminance,
    pub weather: Weather,
}

/// Shared handle on the simulated environment.
///
/// The operator console and the environment agent both go through it.
#[derive(Debug, Clone)]
pub struct EnvironmentHandle {
    state: Arc<RwLock<EnvironmentState>>,
}

impl EnvironmentHandle {
    pub fn new(illuminance: Illuminance, weather: Weather) -> Self {
        Self {
            state: Arc::new(RwLock::new(EnvironmentState {
                illuminance,
                weather,
            })),
        }
    }

    pub fn illuminance(&self) -> Illuminance {
        self.state.read().illuminance
    }

    pub fn set_illuminance(&self, value: Illuminance) {
        self.state.write().illuminance = value;
    }

    pub fn weather(&self) -> Weather {
        self.state.read().weather
    }

    pub fn set_weather(&self, value: Weather) {
        self.state.write().weather = value;
    }

    pub fn snapshot(&self) -> EnvironmentState {
        *self.state.read()
    }
}

impl TopicSource for EnvironmentHandle {
    fn current_value(&self, topic: &str) -> Option<String> {
        match topic {
            READ_ILLUMINANCE => Some(self.illuminance().to_string()),
            READ_WEATHER => Some(self.weather().to_string()),
            _ => None,
        }
    }
}

impl Actuator for EnvironmentHandle {
    fn apply(&self, value: &str) -> bool {
        match value.parse::<Illuminance>() {
            Ok(illuminance) => {
                self.set_illuminance(illuminance);
                true
            }
            Err(_) => false,
        }
    }
}

/// The building environment agent
pub struct BuildingEnvironment {
    handle: EnvironmentHandle,
    registry: Arc<SubscriberRegistry>,
    notification_interval_ms: u64,
    status_interval_ms: u64,
}

impl BuildingEnvironment {
    pub fn new(settings: &EnvironmentSettings) -> Self {
        Self {
            handle: EnvironmentHandle::new(settings.initial_illuminance, settings.initial_weather),
            registry: Arc::new(SubscriberRegistry::new()),
            notification_interval_ms: settings.notification_interval_ms,
            status_interval_ms: settings.status_interval_ms,
        }
    }

    pub fn handle(&self) -> EnvironmentHandle {
        self.handle.clone()
    }

    pub fn subscribers(&self) -> Arc<SubscriberRegistry> {
        self.registry.clone()
    }
}

impl AgentRole for BuildingEnvironment {
    fn role(&self) -> &'static str {
        "environment"
    }

    fn setup(&self, agent: &mut Agent) -> Result<(), BehaviorError> {
        info!(agent = %agent.id(), state = ?self.handle.snapshot(), "Building environment agent set up");

        agent.add_behavior(PublishServices::new([
            READ_ILLUMINANCE,
            READ_WEATHER,
            SET_ILLUMINANCE,
        ]))?;
        agent.add_behavior(SubscriptionResponder::new(
            [READ_ILLUMINANCE, READ_WEATHER],
            self.registry.clone(),
            Arc::new(self.handle.clone()),
            self.notification_interval_ms,
        ))?;
        agent.add_behavior(RequestResponder::new(
            SET_ILLUMINANCE,
            Arc::new(self.handle.clone()),
        ))?;

        let handle = self.handle.clone();
        agent.add_behavior(TickerBehavior::new(
            "environment-status",
            self.status_interval_ms,
            move |_ctx: &mut AgentContext<'_>| {
                let state = handle.snapshot();
                info!(illuminance = %state.illuminance, weather = %state.weather, "Environment status");
                record_environment(
                    state.illuminance == Illuminance::Low,
                    state.weather == Weather::Cloudy,
                );
            },
        ))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_values() {
        let handle = EnvironmentHandle::new(Illuminance::High, Weather::Sunny);
        assert_eq!(handle.current_value(READ_ILLUMINANCE).as_deref(), Some("high"));
        assert_eq!(handle.current_value(READ_WEATHER).as_deref(), Some("sunny"));
        assert_eq!(handle.current_value("read-humidity"), None);

        handle.set_weather(Weather::Cloudy);
        assert_eq!(handle.current_value(READ_WEATHER).as_deref(), Some("cloudy"));
    }

    #[test]
    fn test_actuator_accepts_legal_values_only() {
        let handle = EnvironmentHandle::new(Illuminance::High, Weather::Sunny);
        assert!(handle.apply("low"));
        assert_eq!(handle.illuminance(), Illuminance::Low);

        assert!(!handle.apply("medium"));
        assert_eq!(handle.illuminance(), Illuminance::Low);
    }

    #[test]
    fn test_handles_share_state() {
        let env = BuildingEnvironment::new(&EnvironmentSettings::default());
        let console = env.handle();
        console.set_illuminance(Illuminance::Low);
        assert_eq!(env.handle().snapshot().illuminance, Illuminance::Low);
    }
}
