// platform/discovery.rs - Service publication and provider discovery

use std::collections::{BTreeSet, HashMap};
use tracing::{error, info, warn};

use crate::acl_message::AgentId;
use crate::agent::AgentContext;
use crate::behavior::{Behavior, BehaviorConfig, Step};

/// Providers an agent has discovered, per service type.
///
/// A service with no providers may be absent or map to an empty set; both
/// read the same through this API.
#[derive(Debug, Clone, Default)]
pub struct ServiceProviders {
    entries: HashMap<String, BTreeSet<AgentId>>,
}

impl ServiceProviders {
    pub fn insert(&mut self, service_type: impl Into<String>, providers: BTreeSet<AgentId>) {
        self.entries.insert(service_type.into(), providers);
    }

    pub fn get(&self, service_type: &str) -> Option<&BTreeSet<AgentId>> {
        self.entries.get(service_type).filter(|p| !p.is_empty())
    }

    /// Copy of the known providers, empty if none
    pub fn snapshot(&self, service_type: &str) -> BTreeSet<AgentId> {
        self.get(service_type).cloned().unwrap_or_default()
    }

    /// The provider, if exactly one is known
    pub fn single(&self, service_type: &str) -> Option<&AgentId> {
        match self.get(service_type) {
            Some(providers) if providers.len() == 1 => providers.iter().next(),
            _ => None,
        }
    }

    pub fn count(&self, service_type: &str) -> usize {
        self.get(service_type).map(|p| p.len()).unwrap_or(0)
    }
}

/// Publishes an agent's services to the directory once.
///
/// Registration errors are logged and swallowed; they never stop the agent.
pub struct PublishServices {
    services: BTreeSet<String>,
}

impl PublishServices {
    pub fn new<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            services: services.into_iter().map(Into::into).collect(),
        }
    }
}

impl Behavior for PublishServices {
    fn name(&self) -> &str {
        "publish-services"
    }

    fn config(&self) -> BehaviorConfig {
        BehaviorConfig::one_shot()
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let agent = ctx.id().clone();
        if let Err(e) = ctx.directory().register(&agent, self.services.iter().cloned()) {
            error!(agent = %agent, error = %e, "Failed to publish services");
        }
        Step::Done
    }
}

/// Retry policy for provider discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    /// Searches before giving up
    pub max_attempts: u32,
    /// Pause between searches (ms)
    pub retry_interval_ms: u64,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            retry_interval_ms: 500,
        }
    }
}

/// Terminal result of a discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    Found(BTreeSet<AgentId>),
    NotFound { attempts: u32 },
}

/// Searches the directory until a provider of `service_type` shows up.
///
/// Runs as a ticker so attempts are spaced by the retry interval, and gives
/// up after `max_attempts` searches.
pub struct SearchService {
    service_type: String,
    policy: DiscoveryPolicy,
    attempts: u32,
    outcome: Option<DiscoveryOutcome>,
}

impl SearchService {
    pub fn new(service_type: impl Into<String>, policy: DiscoveryPolicy) -> Self {
        Self {
            service_type: service_type.into(),
            policy,
            attempts: 0,
            outcome: None,
        }
    }

    pub fn outcome(&self) -> Option<&DiscoveryOutcome> {
        self.outcome.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// One search attempt
    pub fn step(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        if self.outcome.is_some() {
            return Step::Done;
        }

        self.attempts += 1;
        let found = ctx.search(&self.service_type);

        if !found.is_empty() {
            info!(
                agent = %ctx.id(),
                service = %self.service_type,
                providers = found.len(),
                attempts = self.attempts,
                "Service providers discovered"
            );
            self.outcome = Some(DiscoveryOutcome::Found(found));
            return Step::Done;
        }

        if self.attempts >= self.policy.max_attempts.max(1) {
            warn!(
                agent = %ctx.id(),
                service = %self.service_type,
                attempts = self.attempts,
                "No provider found, giving up"
            );
            self.outcome = Some(DiscoveryOutcome::NotFound {
                attempts: self.attempts,
            });
            return Step::Done;
        }

        Step::Continue
    }
}

impl Behavior for SearchService {
    fn name(&self) -> &str {
        "search-service"
    }

    fn config(&self) -> BehaviorConfig {
        BehaviorConfig::ticker(self.policy.retry_interval_ms)
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        self.step(ctx)
    }
}
