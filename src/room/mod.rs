// room/mod.rs - Room illuminance scenario

//! The room scenario: a manager keeps the room lit by negotiating with
//! device controllers whenever the environment reports low illuminance.
//!
//! - [`RoomManager`] subscribes to illuminance and weather and runs a
//!   Contract Net round on every transition into low illuminance
//! - [`DeviceController`] (lamp, blinds) proposes an offer and, once
//!   accepted, asks the environment to raise the illuminance
//! - [`BuildingEnvironment`] serves percept subscriptions and set requests

pub mod console;
pub mod devices;
pub mod environment;
pub mod manager;
pub mod percept;

pub use console::{ConsoleCommand, ConsoleError};
pub use devices::DeviceController;
pub use environment::{BuildingEnvironment, EnvironmentHandle, EnvironmentState};
pub use manager::{OfferPreference, RoomManager};
pub use percept::{Illuminance, PerceivedState, PerceptError, Weather};

use crate::agent::Agent;
use crate::behavior::BehaviorError;

pub const INCREASE_ILLUMINANCE: &str = "increase-illuminance";
pub const READ_ILLUMINANCE: &str = "read-illuminance";
pub const READ_WEATHER: &str = "read-weather";
pub const SET_ILLUMINANCE: &str = "set-illuminance";

pub const TURN_ON_LIGHT: &str = "turn-on-light";
pub const RAISE_BLINDS: &str = "raise-blinds";

/// A part an agent plays in the scenario: installs its behaviors
pub trait AgentRole: Send {
    /// Short role name used in logs and metrics
    fn role(&self) -> &'static str;

    fn setup(&self, agent: &mut Agent) -> Result<(), BehaviorError>;
}
