// actor/registry.rs - Actor Name Registry

use actix::prelude::*;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::actor::messages::*;
use crate::actor::AgentActor;

/// Actor registry for name-based lookups
#[derive(Default)]
pub struct ActorRegistry {
    /// Local agent actors
    local_agents: Arc<DashMap<String, Addr<AgentActor>>>,
}

impl ActorRegistry {
    /// Create a new registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a shared reference to local agents map
    pub fn local_agents(&self) -> Arc<DashMap<String, Addr<AgentActor>>> {
        self.local_agents.clone()
    }

    /// Check if an agent is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.local_agents.contains_key(name)
    }
}

impl Actor for ActorRegistry {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("ActorRegistry started");
    }
}

// =============================================================================
// Message Handlers
// =============================================================================

impl Handler<RegisterActor> for ActorRegistry {
    type Result = ();

    fn handle(&mut self, msg: RegisterActor, _ctx: &mut Self::Context) {
        debug!(agent = %msg.name, "Registering actor");
        self.local_agents.insert(msg.name, msg.addr);
    }
}

impl Handler<DeregisterActor> for ActorRegistry {
    type Result = ();

    fn handle(&mut self, msg: DeregisterActor, _ctx: &mut Self::Context) {
        debug!(agent = %msg.name, "Deregistering actor");
        self.local_agents.remove(&msg.name);
    }
}

impl Handler<LookupActor> for ActorRegistry {
    type Result = Option<Addr<AgentActor>>;

    fn handle(&mut self, msg: LookupActor, _ctx: &mut Self::Context) -> Self::Result {
        self.local_agents.get(&msg.name).map(|v| v.clone())
    }
}

impl Handler<ListActors> for ActorRegistry {
    type Result = Vec<String>;

    fn handle(&mut self, _msg: ListActors, _ctx: &mut Self::Context) -> Self::Result {
        let mut names: Vec<String> = self.local_agents.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Handler<ShutdownAll> for ActorRegistry {
    type Result = usize;

    fn handle(&mut self, msg: ShutdownAll, _ctx: &mut Self::Context) -> Self::Result {
        let count = self.local_agents.len();
        info!(agents = count, reason = ?msg.reason, "Shutting down all agents");
        for entry in self.local_agents.iter() {
            entry.value().do_send(Shutdown {
                reason: msg.reason.clone(),
            });
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use std::time::Duration;

    #[actix_rt::test]
    async fn test_register_lookup_and_shutdown_all() {
        let platform = Platform::default();
        let registry = ActorRegistry::new().start();

        let agent = platform.create_agent("room-manager").unwrap();
        let _addr = AgentActor::new(agent, "manager")
            .with_registry(registry.clone())
            .start();
        actix_rt::time::sleep(Duration::from_millis(30)).await;

        let names = registry.send(ListActors).await.unwrap();
        assert_eq!(names, vec!["room-manager".to_string()]);
        let found = registry
            .send(LookupActor {
                name: "room-manager".into(),
            })
            .await
            .unwrap();
        assert!(found.is_some());

        let stopped = registry
            .send(ShutdownAll {
                reason: ShutdownReason::PlatformShutdown,
            })
            .await
            .unwrap();
        assert_eq!(stopped, 1);
        actix_rt::time::sleep(Duration::from_millis(30)).await;

        let names = registry.send(ListActors).await.unwrap();
        assert!(names.is_empty());
    }
}
