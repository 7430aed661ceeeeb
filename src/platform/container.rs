// platform/container.rs - Agent Platform
//
//! The platform owns what every agent shares: the message bus, the
//! directory facilitator and the sniffer. It is also the naming service,
//! so no two live agents carry the same name.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::df::{DFConfig, DirectoryFacilitator};
use crate::acl_message::AgentId;
use crate::agent::Agent;
use crate::behavior::BehaviorError;
use crate::network::MessageBus;
use crate::room::AgentRole;
use crate::tools::{MessageSniffer, SnifferConfig};

/// Names no agent may take
pub const RESERVED_NAMES: [&str; 2] = ["ams", "df"];

/// Platform errors
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Agent name not available: {0}")]
    NameNotAvailable(String),

    #[error("Agent setup failed: {0}")]
    Setup(#[from] BehaviorError),
}

/// Shared services of one agent platform
pub struct Platform {
    bus: Arc<MessageBus>,
    directory: Arc<DirectoryFacilitator>,
    sniffer: Arc<MessageSniffer>,
    names: Mutex<HashSet<String>>,
}

impl Default for Platform {
    fn default() -> Self {
        Self::new(DFConfig::default(), SnifferConfig::default())
    }
}

impl Platform {
    pub fn new(df_config: DFConfig, sniffer_config: SnifferConfig) -> Self {
        let sniffer = Arc::new(MessageSniffer::new(sniffer_config));
        Self {
            bus: Arc::new(MessageBus::new().with_sniffer(sniffer.clone())),
            directory: Arc::new(DirectoryFacilitator::new(df_config)),
            sniffer,
            names: Mutex::new(HashSet::new()),
        }
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn directory(&self) -> &Arc<DirectoryFacilitator> {
        &self.directory
    }

    pub fn sniffer(&self) -> &Arc<MessageSniffer> {
        &self.sniffer
    }

    /// Check if a name is available
    pub fn is_name_available(&self, name: &str) -> bool {
        !RESERVED_NAMES.contains(&name) && !self.names.lock().contains(name)
    }

    /// Create an agent with a mailbox on the bus and no behaviors
    pub fn create_agent(&self, name: &str) -> Result<Agent, PlatformError> {
        let name = name.trim();
        if name.is_empty() || RESERVED_NAMES.contains(&name) {
            return Err(PlatformError::NameNotAvailable(name.to_string()));
        }
        if !self.names.lock().insert(name.to_string()) {
            return Err(PlatformError::NameNotAvailable(name.to_string()));
        }

        Ok(Agent::new(
            AgentId::new(name),
            self.bus.clone(),
            self.directory.clone(),
        ))
    }

    /// Create an agent and let `role` install its behaviors
    pub fn spawn_role(&self, name: &str, role: &dyn AgentRole) -> Result<Agent, PlatformError> {
        let mut agent = self.create_agent(name)?;
        if let Err(e) = role.setup(&mut agent) {
            self.release(&mut agent);
            return Err(e.into());
        }
        info!(agent = %agent.id(), role = role.role(), "Agent spawned");
        Ok(agent)
    }

    /// Shut the agent down and free its name
    pub fn release(&self, agent: &mut Agent) {
        agent.shutdown();
        self.names.lock().remove(&agent.id().name);
    }

    /// Names of the agents currently alive on the platform
    pub fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.lock().iter().cloned().collect();
        names.sort();
        names
    }
}
