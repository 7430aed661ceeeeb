// lib.rs - FIPA Room Agents
//
// A room illuminance negotiation built on FIPA Contract Net, Subscribe and
// Request protocols, with JADE-style behaviors driven by Actix actors.

pub mod acl_message;
pub mod actor;
pub mod agent;
pub mod behavior;
pub mod config;
pub mod network;
pub mod observability;
pub mod platform;
pub mod protocol;
pub mod room;
pub mod tools;

// Re-export commonly used types
pub use acl_message::{AclMessage, AgentId, Performative};

pub use actor::{
    ActorRegistry, AgentActor, AgentError, AgentRuntimeState, AgentStatus, GetStatus, Shutdown,
    ShutdownReason,
};

pub use agent::{Agent, AgentContext};

pub use behavior::{Behavior, BehaviorError, BehaviorScheduler, Step};

pub use config::{ConfigError, SimulationConfig};

pub use platform::{DirectoryFacilitator, Platform, PlatformError};

pub use protocol::{
    CommitmentResponder, ContractNetInitiator, NegotiationOutcome, ProposalResponder,
    RequestInitiator, RequestResponder, SubscribeInitiator, SubscriptionResponder,
};

pub use room::{AgentRole, BuildingEnvironment, DeviceController, RoomManager};

pub use observability::{
    init_metrics, init_tracing, record_agent_started, record_agent_stopped, record_negotiation,
    MetricsConfig, MetricsHandle, TracingConfig, TracingFormat,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::acl_message::{AclMessage, AgentId, Performative};
    pub use crate::actor::{
        ActorRegistry, AgentActor, AgentError, AgentStatus, GetStatus, Shutdown, ShutdownReason,
    };
    pub use crate::agent::{Agent, AgentContext};
    pub use crate::behavior::{
        Behavior, BehaviorConfig, BehaviorError, OneShotBehavior, Step, TickerBehavior,
        WakerBehavior,
    };
    pub use crate::config::SimulationConfig;
    pub use crate::platform::{DirectoryFacilitator, Platform, SearchService};
    pub use crate::protocol::{
        CommitmentResponder, ContractNetInitiator, MessageTemplate, NegotiationOutcome,
        OfferPolicy, ProposalResponder, RequestInitiator, RequestResponder, SubscribeInitiator,
        SubscriptionResponder,
    };
    pub use crate::room::{
        AgentRole, BuildingEnvironment, DeviceController, EnvironmentHandle, Illuminance,
        RoomManager, Weather,
    };
}
