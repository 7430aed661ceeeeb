// platform/df.rs - Directory Facilitator (DF)
//
//! Directory Facilitator (DF)
//!
//! Yellow pages service shared by every agent of a platform:
//! - agents register the service types they offer
//! - agents search for the providers of a service type
//!
//! Registration replaces the agent's previous advertisement, so publishing
//! twice is harmless. A service with no providers is simply absent.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::acl_message::AgentId;

/// DF configuration
#[derive(Debug, Clone)]
pub struct DFConfig {
    /// Platform name
    pub platform_name: String,

    /// Maximum services per agent
    pub max_services_per_agent: usize,

    /// Maximum total registrations (0 = unlimited)
    pub max_total_services: usize,
}

impl Default for DFConfig {
    fn default() -> Self {
        Self {
            platform_name: "room-platform".to_string(),
            max_services_per_agent: 16,
            max_total_services: 1024,
        }
    }
}

/// DF statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DFStats {
    pub registrations: u64,
    pub deregistrations: u64,
    pub searches: u64,
    pub search_results: u64,
}

#[derive(Debug, Default)]
struct DFTables {
    /// service type -> providers
    services: HashMap<String, BTreeSet<AgentId>>,

    /// agent -> advertised service types
    agent_services: HashMap<AgentId, BTreeSet<String>>,

    stats: DFStats,
}

impl DFTables {
    fn total_registrations(&self) -> usize {
        self.agent_services.values().map(|s| s.len()).sum()
    }

    fn remove_agent(&mut self, agent: &AgentId) -> Option<BTreeSet<String>> {
        let previous = self.agent_services.remove(agent)?;
        for service in &previous {
            if let Some(providers) = self.services.get_mut(service) {
                providers.remove(agent);
                if providers.is_empty() {
                    self.services.remove(service);
                }
            }
        }
        Some(previous)
    }
}

/// Directory Facilitator
#[derive(Debug)]
pub struct DirectoryFacilitator {
    config: DFConfig,
    tables: RwLock<DFTables>,
}

impl Default for DirectoryFacilitator {
    fn default() -> Self {
        Self::new(DFConfig::default())
    }
}

impl DirectoryFacilitator {
    /// Create a new DF
    pub fn new(config: DFConfig) -> Self {
        info!(platform = %config.platform_name, "DF started");
        Self {
            config,
            tables: RwLock::new(DFTables::default()),
        }
    }

    pub fn config(&self) -> &DFConfig {
        &self.config
    }

    /// Register (or re-register) the services an agent offers.
    ///
    /// The new set replaces whatever the agent advertised before. On error
    /// the directory is left unchanged.
    pub fn register<I, S>(&self, agent: &AgentId, services: I) -> Result<(), DFError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let services: BTreeSet<String> = services.into_iter().map(Into::into).collect();

        if services.iter().any(|s| s.trim().is_empty()) {
            return Err(DFError::InvalidService("empty service type".into()));
        }

        if services.len() > self.config.max_services_per_agent {
            return Err(DFError::AgentServiceLimitReached {
                agent: agent.name.clone(),
                limit: self.config.max_services_per_agent,
            });
        }

        let mut tables = self.tables.write();

        let current = tables.agent_services.get(agent).map(|s| s.len()).unwrap_or(0);
        let projected = tables.total_registrations() - current + services.len();
        if self.config.max_total_services > 0 && projected > self.config.max_total_services {
            return Err(DFError::TotalServiceLimitReached(self.config.max_total_services));
        }

        tables.remove_agent(agent);
        for service in &services {
            tables
                .services
                .entry(service.clone())
                .or_default()
                .insert(agent.clone());
        }

        info!(agent = %agent, services = ?services, "DF: registered services");
        tables.agent_services.insert(agent.clone(), services);
        tables.stats.registrations += 1;

        Ok(())
    }

    /// Remove every advertisement of an agent. Returns false if it had none.
    pub fn deregister(&self, agent: &AgentId) -> bool {
        let mut tables = self.tables.write();
        match tables.remove_agent(agent) {
            Some(services) => {
                tables.stats.deregistrations += 1;
                info!(agent = %agent, services = ?services, "DF: deregistered");
                true
            }
            None => false,
        }
    }

    /// Providers currently advertising `service_type`, possibly none
    pub fn search(&self, service_type: &str) -> BTreeSet<AgentId> {
        let mut tables = self.tables.write();
        let providers = tables
            .services
            .get(service_type)
            .cloned()
            .unwrap_or_default();

        tables.stats.searches += 1;
        tables.stats.search_results += providers.len() as u64;
        debug!(service = service_type, found = providers.len(), "DF: search");

        providers
    }

    /// Services advertised by an agent
    pub fn services_of(&self, agent: &AgentId) -> BTreeSet<String> {
        self.tables
            .read()
            .agent_services
            .get(agent)
            .cloned()
            .unwrap_or_default()
    }

    /// Get DF statistics
    pub fn stats(&self) -> DFStats {
        self.tables.read().stats.clone()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// DF errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DFError {
    #[error("Agent '{agent}' exceeds the limit of {limit} services")]
    AgentServiceLimitReached { agent: String, limit: usize },

    #[error("Total service limit of {0} reached")]
    TotalServiceLimitReached(usize),

    #[error("Invalid service description: {0}")]
    InvalidService(String),
}
