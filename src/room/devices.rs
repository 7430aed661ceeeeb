// room/devices.rs - Lamp and blinds controllers

use tracing::info;

use super::{AgentRole, INCREASE_ILLUMINANCE, SET_ILLUMINANCE};
use crate::agent::Agent;
use crate::behavior::BehaviorError;
use crate::config::{DeviceSettings, SimulationConfig};
use crate::platform::{DiscoveryPolicy, PublishServices, SearchService};
use crate::protocol::{CommitmentResponder, ProposalResponder, RequestInitiator};

/// A controller offering one way of increasing the room's illuminance.
///
/// It answers every call for proposals with its offer. Once the offer is
/// accepted it asks the environment's `set-illuminance` provider for the
/// target level.
pub struct DeviceController {
    role: &'static str,
    settings: DeviceSettings,
    discovery: DiscoveryPolicy,
}

impl DeviceController {
    pub fn new(role: &'static str, settings: DeviceSettings, discovery: DiscoveryPolicy) -> Self {
        Self {
            role,
            settings,
            discovery,
        }
    }

    pub fn lamp(config: &SimulationConfig) -> Self {
        Self::new("lamp", config.lamp.clone(), config.discovery.policy())
    }

    pub fn blinds(config: &SimulationConfig) -> Self {
        Self::new("blinds", config.blinds.clone(), config.discovery.policy())
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }
}

impl AgentRole for DeviceController {
    fn role(&self) -> &'static str {
        self.role
    }

    fn setup(&self, agent: &mut Agent) -> Result<(), BehaviorError> {
        info!(
            agent = %agent.id(),
            role = self.role,
            offer = %self.settings.offer,
            "Device controller agent set up"
        );

        agent.add_behavior(PublishServices::new([INCREASE_ILLUMINANCE]))?;
        agent.add_behavior(SearchService::new(SET_ILLUMINANCE, self.discovery))?;
        agent.add_behavior(ProposalResponder::new(
            INCREASE_ILLUMINANCE,
            self.settings.offer.clone(),
        ))?;

        let target = self.settings.target.to_string();
        agent.add_behavior(CommitmentResponder::new(
            self.settings.offer.clone(),
            move || RequestInitiator::new(SET_ILLUMINANCE, target.clone()),
        ))?;
        Ok(())
    }
}
