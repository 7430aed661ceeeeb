// protocol/mod.rs - FIPA Protocol Implementations

//! FIPA interaction protocols, each implemented as behaviors.
//!
//! - Contract Net: [`ContractNetInitiator`], [`ProposalResponder`], [`CommitmentResponder`]
//! - Subscribe: [`SubscribeInitiator`], [`PerceptHandler`], [`SubscriptionResponder`],
//!   [`NotificationTicker`]
//! - Request: [`RequestInitiator`], [`RequestResponder`]
//!
//! Initiators are explicit state machines. Every outbound message that
//! expects an answer opens a [`Conversation`], and replies are picked out of
//! the inbox with that conversation's [`MessageTemplate`], so any number of
//! rounds can run side by side in one agent.
//!
//! # Example
//!
//! ```ignore
//! use fipa_room_agents::protocol::*;
//!
//! let round = ContractNetInitiator::new("increase-illuminance", |offer: &str| {
//!     offer == "turn-on-light"
//! });
//! agent.add_behavior(round)?;
//! ```

mod contract_net;
mod correlator;
mod request;
mod subscribe;

pub use contract_net::{
    prefers, select_best, CommitmentResponder, ContractNetInitiator, ContractNetPhase, Effect,
    NegotiationOutcome, OfferPolicy, OutcomeSink, Proposal, ProposalResponder, INFORM_DONE,
    NOT_AVAILABLE,
};
pub use correlator::{
    accept_topic, cfp_topic, new_reply_tag, request_topic, subscribe_topic, Conversation,
    MessageTemplate,
};
pub use request::{Actuator, RequestInitiator, RequestOutcome, RequestPhase, RequestResponder};
pub use subscribe::{
    NotificationTicker, PerceptHandler, PerceptSink, SubscribeInitiator, SubscribeOutcome,
    SubscribePhase, SubscriberRegistry, SubscriptionResponder, TopicSource,
};
