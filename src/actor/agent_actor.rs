// actor/agent_actor.rs - Agent Actor

use actix::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::actor::messages::*;
use crate::agent::Agent;
use crate::observability::{record_agent_started, record_agent_stopped};

/// Default interval between scheduling ticks
pub const DEFAULT_TICK: Duration = Duration::from_millis(20);

/// Default bound on behavior turns per tick
pub const DEFAULT_MAX_TURNS: usize = 64;

/// Actor driving one agent's behaviors
pub struct AgentActor {
    /// The agent and its behaviors
    agent: Agent,

    /// Role name for logs and metrics
    role: &'static str,

    /// Interval between scheduling ticks
    tick: Duration,

    /// Turns run per tick at most
    max_turns: usize,

    /// Registry for name-based lookups
    registry: Option<Addr<super::ActorRegistry>>,

    /// Runtime state
    state: AgentRuntimeState,

    /// Start time
    start_time: Instant,
}

impl AgentActor {
    /// Create a new agent actor
    pub fn new(agent: Agent, role: &'static str) -> Self {
        Self {
            agent,
            role,
            tick: DEFAULT_TICK,
            max_turns: DEFAULT_MAX_TURNS,
            registry: None,
            state: AgentRuntimeState::Starting,
            start_time: Instant::now(),
        }
    }

    /// Set the scheduling tick and turn bound
    pub fn with_schedule(mut self, tick: Duration, max_turns: usize) -> Self {
        self.tick = tick;
        self.max_turns = max_turns.max(1);
        self
    }

    /// Set the registry address
    pub fn with_registry(mut self, registry: Addr<super::ActorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    fn name(&self) -> String {
        self.agent.id().name.clone()
    }

    /// Run the agent until it has nothing left to do this tick
    fn run_tick(&mut self) {
        let report = self.agent.run_until_idle(self.max_turns);
        if report.completed > 0 {
            debug!(
                agent = %self.agent.id(),
                executed = report.executed,
                completed = report.completed,
                "Tick finished"
            );
        }
    }
}

impl Actor for AgentActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(agent = %self.agent.id(), role = self.role, "Agent starting");
        record_agent_started(self.role);

        if let Some(registry) = &self.registry {
            registry.do_send(RegisterActor {
                name: self.name(),
                addr: ctx.address(),
            });
        }

        self.state = AgentRuntimeState::Running;
        ctx.run_interval(self.tick, |actor, _ctx| {
            if actor.state == AgentRuntimeState::Running {
                actor.run_tick();
            }
        });
    }

    fn stopping(&mut self, _ctx: &mut Self::Context) -> Running {
        info!(agent = %self.agent.id(), "Agent stopping");
        self.state = AgentRuntimeState::Stopping;
        record_agent_stopped(self.role);

        self.agent.shutdown();

        if let Some(registry) = &self.registry {
            registry.do_send(DeregisterActor { name: self.name() });
        }

        Running::Stop
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(agent = %self.agent.id(), "Agent stopped");
        self.state = AgentRuntimeState::Stopped;
    }
}

// =============================================================================
// Message Handlers
// =============================================================================

impl Handler<Shutdown> for AgentActor {
    type Result = ();

    #[instrument(skip(self, msg, ctx), fields(agent = %self.agent.id()))]
    fn handle(&mut self, msg: Shutdown, ctx: &mut Self::Context) {
        info!(reason = ?msg.reason, "Shutdown requested");
        ctx.stop();
    }
}

impl Handler<GetStatus> for AgentActor {
    type Result = AgentStatus;

    fn handle(&mut self, _msg: GetStatus, _ctx: &mut Self::Context) -> Self::Result {
        AgentStatus {
            name: self.name(),
            role: self.role,
            state: self.state,
            behaviors: self.agent.behaviors(),
            completed_behaviors: self.agent.scheduler().completed_count(),
            pending_messages: self.agent.pending_messages(),
            turns: self.agent.turns(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}
