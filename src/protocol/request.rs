// protocol/request.rs - FIPA Request Protocol

use std::sync::Arc;
use tracing::{info, warn};

use super::contract_net::INFORM_DONE;
use super::correlator::{request_topic, Conversation, MessageTemplate};
use crate::acl_message::Performative;
use crate::agent::AgentContext;
use crate::behavior::{Behavior, Step};

/// Request initiator phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Init,
    AwaitReply,
    Terminated,
}

/// How a request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Zero or several providers known for the service
    NoAppropriateProvider,
    Informed,
    /// Any other reply, with its content
    Failed(String),
}

/// One-shot imperative request to the single provider of a service
pub struct RequestInitiator {
    service_type: String,
    value: String,
    phase: RequestPhase,
    conversation: Option<Conversation>,
    outcome: Option<RequestOutcome>,
}

impl RequestInitiator {
    pub fn new(service_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            value: value.into(),
            phase: RequestPhase::Init,
            conversation: None,
            outcome: None,
        }
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<&RequestOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.phase == RequestPhase::Terminated
    }

    pub fn step(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        match self.phase {
            RequestPhase::Init => self.request(ctx),
            RequestPhase::AwaitReply => self.await_reply(ctx),
            RequestPhase::Terminated => Step::Done,
        }
    }

    fn request(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        info!(agent = %ctx.id(), service = %self.service_type, "Initiating Request protocol");

        let Some(provider) = ctx.providers().single(&self.service_type).cloned() else {
            info!(
                service = %self.service_type,
                providers = ctx.providers().count(&self.service_type),
                "No appropriate service provider found"
            );
            return self.terminate(RequestOutcome::NoAppropriateProvider);
        };

        let conversation = Conversation::open(request_topic(&self.service_type), "request");
        let msg = conversation.stamp(
            ctx.message(Performative::Request)
                .with_receiver(provider.clone())
                .with_content(self.value.clone()),
        );
        ctx.send(msg);
        info!(
            agent = %ctx.id(),
            service = %self.service_type,
            value = %self.value,
            provider = %provider,
            "REQUEST sent"
        );

        self.conversation = Some(conversation);
        self.phase = RequestPhase::AwaitReply;
        Step::Continue
    }

    fn await_reply(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let template = self
            .conversation
            .as_ref()
            .map(Conversation::template)
            .unwrap_or(MessageTemplate::Any);
        let Some(reply) = ctx.receive(&template) else {
            return Step::Block;
        };

        let outcome = if reply.performative == Performative::Inform {
            RequestOutcome::Informed
        } else {
            warn!(
                service = %self.service_type,
                performative = %reply.performative,
                content = %reply.content,
                "Request not carried out"
            );
            RequestOutcome::Failed(reply.content)
        };
        self.terminate(outcome)
    }

    fn terminate(&mut self, outcome: RequestOutcome) -> Step {
        info!(service = %self.service_type, ?outcome, "Request protocol terminated");
        self.outcome = Some(outcome);
        self.phase = RequestPhase::Terminated;
        Step::Done
    }
}

impl Behavior for RequestInitiator {
    fn name(&self) -> &str {
        "request-initiator"
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        self.step(ctx)
    }
}

/// Applies a requested value to some external state
pub trait Actuator: Send + Sync {
    /// Apply `value`; false if it is not a legal value
    fn apply(&self, value: &str) -> bool;
}

/// Serves requests for one service, replying exactly once to each
pub struct RequestResponder {
    service_type: String,
    actuator: Arc<dyn Actuator>,
    template: MessageTemplate,
}

impl RequestResponder {
    pub fn new(service_type: impl Into<String>, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            service_type: service_type.into(),
            actuator,
            template: MessageTemplate::match_performative(Performative::Request),
        }
    }
}

impl Behavior for RequestResponder {
    fn name(&self) -> &str {
        "request-responder"
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(msg) = ctx.receive(&self.template) else {
            return Step::Block;
        };

        if self.actuator.apply(&msg.content) {
            info!(agent = %ctx.id(), service = %self.service_type, value = %msg.content, "INFORM done");
            ctx.reply(&msg, Performative::Inform, INFORM_DONE);
        } else {
            info!(agent = %ctx.id(), service = %self.service_type, value = %msg.content, "FAILURE illegal value");
            ctx.reply(&msg, Performative::Failure, self.service_type.clone());
        }
        Step::Continue
    }
}
