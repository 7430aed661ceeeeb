// room/manager.rs - Room manager

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use super::percept::{Illuminance, PerceivedState, Weather};
use super::{AgentRole, INCREASE_ILLUMINANCE, READ_ILLUMINANCE, READ_WEATHER};
use crate::agent::{Agent, AgentContext};
use crate::behavior::{BehaviorError, WakerBehavior};
use crate::config::SimulationConfig;
use crate::platform::{DiscoveryPolicy, SearchService};
use crate::protocol::{
    ContractNetInitiator, OfferPolicy, OutcomeSink, PerceptHandler, PerceptSink, SubscribeInitiator,
};

/// Judges offers against the perceived weather.
///
/// Under cloudy skies only the lamp helps; when it is sunny raising the
/// blinds is preferred. With unknown weather no offer is good.
#[derive(Debug, Clone)]
pub struct OfferPreference {
    perceived: Arc<RwLock<PerceivedState>>,
    cloudy_offer: String,
    sunny_offer: String,
}

impl OfferPreference {
    pub fn new(
        perceived: Arc<RwLock<PerceivedState>>,
        cloudy_offer: impl Into<String>,
        sunny_offer: impl Into<String>,
    ) -> Self {
        Self {
            perceived,
            cloudy_offer: cloudy_offer.into(),
            sunny_offer: sunny_offer.into(),
        }
    }
}

impl OfferPolicy for OfferPreference {
    fn is_good(&self, offer: &str) -> bool {
        match self.perceived.read().weather {
            Some(Weather::Cloudy) => offer == self.cloudy_offer,
            Some(Weather::Sunny) => offer == self.sunny_offer,
            None => false,
        }
    }
}

/// Starts a negotiation on every transition into low illuminance
struct IlluminancePercepts {
    perceived: Arc<RwLock<PerceivedState>>,
    preference: OfferPreference,
    outcomes: OutcomeSink,
}

impl PerceptSink for IlluminancePercepts {
    fn on_percept(&mut self, ctx: &mut AgentContext<'_>, value: &str) {
        let illuminance = match value.parse::<Illuminance>() {
            Ok(v) => v,
            Err(e) => {
                warn!(agent = %ctx.id(), error = %e, "Ignoring illuminance percept");
                return;
            }
        };

        let entered_low = self.perceived.write().update_illuminance(illuminance);
        info!(agent = %ctx.id(), illuminance = %illuminance, "Perceived illuminance");

        if entered_low {
            ctx.add_behavior(
                ContractNetInitiator::new(INCREASE_ILLUMINANCE, self.preference.clone())
                    .with_outcome_sink(self.outcomes.clone()),
            );
        }
    }
}

struct WeatherPercepts {
    perceived: Arc<RwLock<PerceivedState>>,
}

impl PerceptSink for WeatherPercepts {
    fn on_percept(&mut self, ctx: &mut AgentContext<'_>, value: &str) {
        match value.parse::<Weather>() {
            Ok(weather) => {
                self.perceived.write().update_weather(weather);
                info!(agent = %ctx.id(), weather = %weather, "Perceived weather");
            }
            Err(e) => warn!(agent = %ctx.id(), error = %e, "Ignoring weather percept"),
        }
    }
}

/// The room manager agent
pub struct RoomManager {
    perceived: Arc<RwLock<PerceivedState>>,
    outcomes: OutcomeSink,
    preference: OfferPreference,
    perception_delay_ms: u64,
    discovery: DiscoveryPolicy,
}

impl RoomManager {
    pub fn new(config: &SimulationConfig) -> Self {
        let perceived = Arc::new(RwLock::new(PerceivedState::default()));
        Self {
            preference: OfferPreference::new(
                perceived.clone(),
                config.lamp.offer.clone(),
                config.blinds.offer.clone(),
            ),
            perceived,
            outcomes: OutcomeSink::default(),
            perception_delay_ms: config.manager.perception_delay_ms,
            discovery: config.discovery.policy(),
        }
    }

    pub fn perceived(&self) -> PerceivedState {
        *self.perceived.read()
    }

    /// Outcomes of every finished negotiation, oldest first
    pub fn outcomes(&self) -> OutcomeSink {
        self.outcomes.clone()
    }
}

impl AgentRole for RoomManager {
    fn role(&self) -> &'static str {
        "manager"
    }

    fn setup(&self, agent: &mut Agent) -> Result<(), BehaviorError> {
        info!(agent = %agent.id(), "Room manager agent set up");

        let illuminance = IlluminancePercepts {
            perceived: self.perceived.clone(),
            preference: self.preference.clone(),
            outcomes: self.outcomes.clone(),
        };
        let weather = WeatherPercepts {
            perceived: self.perceived.clone(),
        };

        agent.add_behavior(WakerBehavior::new(
            "start-perception",
            self.perception_delay_ms,
            move |ctx: &mut AgentContext<'_>| {
                ctx.add_behavior(SubscribeInitiator::new(
                    READ_ILLUMINANCE,
                    PerceptHandler::new(READ_ILLUMINANCE, illuminance),
                ));
                ctx.add_behavior(SubscribeInitiator::new(
                    READ_WEATHER,
                    PerceptHandler::new(READ_WEATHER, weather),
                ));
            },
        ))?;

        for service in [READ_ILLUMINANCE, READ_WEATHER, INCREASE_ILLUMINANCE] {
            agent.add_behavior(SearchService::new(service, self.discovery))?;
        }
        Ok(())
    }
}
