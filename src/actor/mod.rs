// actor/mod.rs - Actor Module

//! Actor-based agent runtime using Actix.
//!
//! Each [`Agent`](crate::agent::Agent) is driven by one [`AgentActor`],
//! which runs the agent's behaviors on a fixed tick. Actors never share an
//! agent, so behaviors of one agent never run concurrently.
//!
//! - `AgentActor` - Runs one agent's scheduler on an interval
//! - `ActorRegistry` - Name-based actor lookup
//!
//! # Example
//!
//! ```ignore
//! use fipa_room_agents::actor::*;
//!
//! let registry = ActorRegistry::new().start();
//! start_role(&platform, &registry, "lamp-controller", &lamp, DEFAULT_TICK, DEFAULT_MAX_TURNS)?;
//!
//! let status = agent_status(&registry, "lamp-controller").await?;
//! ```

mod agent_actor;
mod launch;
mod messages;
mod registry;

pub use agent_actor::{AgentActor, DEFAULT_MAX_TURNS, DEFAULT_TICK};
pub use launch::{agent_status, shutdown_agents, start_role};
pub use messages::*;
pub use registry::ActorRegistry;
