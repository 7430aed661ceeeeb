// actor/launch.rs - Starting and stopping agent actors

use actix::prelude::*;
use std::time::Duration;
use tracing::info;

use crate::actor::messages::*;
use crate::actor::{ActorRegistry, AgentActor};
use crate::platform::Platform;
use crate::room::AgentRole;

/// Spawn `role` under `name` and start the actor that drives it.
///
/// The actor registers itself with `registry` once started.
pub fn start_role(
    platform: &Platform,
    registry: &Addr<ActorRegistry>,
    name: &str,
    role: &dyn AgentRole,
    tick: Duration,
    max_turns: usize,
) -> Result<Addr<AgentActor>, AgentError> {
    let agent = platform.spawn_role(name, role)?;
    let addr = AgentActor::new(agent, role.role())
        .with_schedule(tick, max_turns)
        .with_registry(registry.clone())
        .start();
    Ok(addr)
}

/// Status of the actor registered under `name`
pub async fn agent_status(
    registry: &Addr<ActorRegistry>,
    name: &str,
) -> Result<AgentStatus, AgentError> {
    let addr = registry
        .send(LookupActor {
            name: name.to_string(),
        })
        .await?
        .ok_or_else(|| AgentError::NotFound(name.to_string()))?;
    Ok(addr.send(GetStatus).await?)
}

/// Stop every registered actor, returning how many were asked to stop
pub async fn shutdown_agents(
    registry: &Addr<ActorRegistry>,
    reason: ShutdownReason,
) -> Result<usize, AgentError> {
    let stopped = registry.send(ShutdownAll { reason }).await?;
    info!(stopped, "Agents asked to stop");
    Ok(stopped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::room::DeviceController;

    #[actix_rt::test]
    async fn test_start_role_and_query_status() {
        let platform = Platform::default();
        let registry = ActorRegistry::new().start();
        let lamp = DeviceController::lamp(&SimulationConfig::default());

        start_role(&platform, &registry, "lamp", &lamp, Duration::from_millis(5), 8).unwrap();
        actix_rt::time::sleep(Duration::from_millis(30)).await;

        let status = agent_status(&registry, "lamp").await.unwrap();
        assert_eq!(status.role, lamp.role());

        let stopped = shutdown_agents(&registry, ShutdownReason::Requested)
            .await
            .unwrap();
        assert_eq!(stopped, 1);
    }

    #[actix_rt::test]
    async fn test_taken_name_fails_setup() {
        let platform = Platform::default();
        let registry = ActorRegistry::new().start();
        let lamp = DeviceController::lamp(&SimulationConfig::default());

        start_role(&platform, &registry, "lamp", &lamp, Duration::from_millis(5), 8).unwrap();
        let err = start_role(&platform, &registry, "lamp", &lamp, Duration::from_millis(5), 8)
            .unwrap_err();
        assert!(matches!(err, AgentError::SetupFailed(_)));

        let err = start_role(&platform, &registry, "df", &lamp, Duration::from_millis(5), 8)
            .unwrap_err();
        assert!(matches!(err, AgentError::SetupFailed(_)));
    }

    #[actix_rt::test]
    async fn test_unknown_agent_not_found() {
        let registry = ActorRegistry::new().start();
        let err = agent_status(&registry, "nobody").await.unwrap_err();
        assert!(matches!(err, AgentError::NotFound(name) if name == "nobody"));
    }
}
