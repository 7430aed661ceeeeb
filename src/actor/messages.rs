// actor/messages.rs - Inter-actor message types

use actix::prelude::*;

use crate::behavior::BehaviorStatus;

/// Request graceful shutdown
#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown {
    pub reason: ShutdownReason,
}

/// Query agent status
#[derive(Message)]
#[rtype(result = "AgentStatus")]
pub struct GetStatus;

// =============================================================================
// Registry Messages
// =============================================================================

/// Register an actor address
#[derive(Message)]
#[rtype(result = "()")]
pub struct RegisterActor {
    pub name: String,
    pub addr: Addr<super::AgentActor>,
}

/// Deregister an actor
#[derive(Message)]
#[rtype(result = "()")]
pub struct DeregisterActor {
    pub name: String,
}

/// Lookup an actor by agent name
#[derive(Message)]
#[rtype(result = "Option<Addr<super::AgentActor>>")]
pub struct LookupActor {
    pub name: String,
}

/// Names of all registered actors, sorted
#[derive(Message)]
#[rtype(result = "Vec<String>")]
pub struct ListActors;

/// Ask every registered actor to shut down
#[derive(Message)]
#[rtype(result = "usize")]
pub struct ShutdownAll {
    pub reason: ShutdownReason,
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Agent error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent setup failed: {0}")]
    SetupFailed(String),

    #[error("Actor mailbox error")]
    MailboxError,
}

impl From<MailboxError> for AgentError {
    fn from(_: MailboxError) -> Self {
        AgentError::MailboxError
    }
}

impl From<crate::platform::PlatformError> for AgentError {
    fn from(err: crate::platform::PlatformError) -> Self {
        AgentError::SetupFailed(err.to_string())
    }
}

/// Shutdown reasons
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    Requested,
    PlatformShutdown,
}

/// Agent runtime status
#[derive(Clone, Debug)]
pub struct AgentStatus {
    pub name: String,
    pub role: &'static str,
    pub state: AgentRuntimeState,
    pub behaviors: Vec<(u64, String, BehaviorStatus)>,
    pub completed_behaviors: u64,
    pub pending_messages: usize,
    pub turns: u64,
    pub uptime_secs: u64,
}

impl<A, M> actix::dev::MessageResponse<A, M> for AgentStatus
where
    A: actix::Actor,
    M: actix::Message<Result = AgentStatus>,
{
    fn handle(self, _ctx: &mut A::Context, tx: Option<actix::dev::OneshotSender<M::Result>>) {
        if let Some(tx) = tx {
            let _ = tx.send(self);
        }
    }
}

/// Agent runtime states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentRuntimeState {
    Starting,
    Running,
    Stopping,
    Stopped,
}
