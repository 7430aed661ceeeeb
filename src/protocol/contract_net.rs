// protocol/contract_net.rs - FIPA Contract Net Protocol

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::correlator::{accept_topic, cfp_topic, Conversation, MessageTemplate};
use crate::acl_message::{AclMessage, AgentId, Performative};
use crate::agent::AgentContext;
use crate::behavior::{Behavior, Step};
use crate::observability::record_negotiation;

/// Content of a refusal or a failed commitment
pub const NOT_AVAILABLE: &str = "not-available";

/// Content of a successful commitment
pub const INFORM_DONE: &str = "inform-done";

/// Contract Net initiator phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractNetPhase {
    Init,
    AwaitProposals,
    CommitBest,
    AwaitOutcome,
    Terminated,
}

impl ContractNetPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractNetPhase::Init => "init",
            ContractNetPhase::AwaitProposals => "await_proposals",
            ContractNetPhase::CommitBest => "commit_best",
            ContractNetPhase::AwaitOutcome => "await_outcome",
            ContractNetPhase::Terminated => "terminated",
        }
    }
}

/// Proposal from a participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub provider: AgentId,
    pub offer: String,
}

/// How a negotiation round ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// Nobody offered the service when the round started
    NoProviders,
    /// Every participant refused
    NoOffers,
    /// The winner informed that the work is done
    Completed { provider: AgentId, offer: String },
    /// The winner answered with anything but INFORM
    NotCompleted { provider: AgentId, offer: String },
}

impl NegotiationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationOutcome::NoProviders => "no_providers",
            NegotiationOutcome::NoOffers => "no_offers",
            NegotiationOutcome::Completed { .. } => "completed",
            NegotiationOutcome::NotCompleted { .. } => "not_completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, NegotiationOutcome::Completed { .. })
    }
}

/// Shared record of finished rounds
pub type OutcomeSink = Arc<Mutex<Vec<NegotiationOutcome>>>;

/// Domain judgement of a single offer
pub trait OfferPolicy: Send {
    fn is_good(&self, offer: &str) -> bool;
}

impl<F> OfferPolicy for F
where
    F: Fn(&str) -> bool + Send,
{
    fn is_good(&self, offer: &str) -> bool {
        self(offer)
    }
}

/// Whether `candidate` displaces the current best.
///
/// A good offer displaces a not-good one; otherwise the first offer stays.
pub fn prefers(policy: &dyn OfferPolicy, current: Option<&Proposal>, candidate: &Proposal) -> bool {
    match current {
        None => true,
        Some(best) => policy.is_good(&candidate.offer) && !policy.is_good(&best.offer),
    }
}

/// Best proposal of a sequence, in arrival order
pub fn select_best<'a, I>(policy: &dyn OfferPolicy, proposals: I) -> Option<Proposal>
where
    I: IntoIterator<Item = &'a Proposal>,
{
    proposals.into_iter().fold(None, |best, candidate| {
        if prefers(policy, best.as_ref(), candidate) {
            Some(candidate.clone())
        } else {
            best
        }
    })
}

/// Initiator side of one Contract Net round.
///
/// Participants are a snapshot of the directory taken when the round starts.
/// Every reply to the call for proposals counts toward completion, whatever
/// its performative, so a participant that never answers stalls the round.
pub struct ContractNetInitiator {
    service_type: String,
    policy: Box<dyn OfferPolicy>,
    phase: ContractNetPhase,
    participants: BTreeSet<AgentId>,
    conversation: Option<Conversation>,
    replies_received: usize,
    best: Option<Proposal>,
    outcome: Option<NegotiationOutcome>,
    sink: Option<OutcomeSink>,
}

impl ContractNetInitiator {
    pub fn new(service_type: impl Into<String>, policy: impl OfferPolicy + 'static) -> Self {
        Self {
            service_type: service_type.into(),
            policy: Box::new(policy),
            phase: ContractNetPhase::Init,
            participants: BTreeSet::new(),
            conversation: None,
            replies_received: 0,
            best: None,
            outcome: None,
            sink: None,
        }
    }

    /// Append the outcome to `sink` when the round ends
    pub fn with_outcome_sink(mut self, sink: OutcomeSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn phase(&self) -> ContractNetPhase {
        self.phase
    }

    pub fn participants(&self) -> &BTreeSet<AgentId> {
        &self.participants
    }

    pub fn replies_received(&self) -> usize {
        self.replies_received
    }

    pub fn best(&self) -> Option<&Proposal> {
        self.best.as_ref()
    }

    pub fn outcome(&self) -> Option<&NegotiationOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.phase == ContractNetPhase::Terminated
    }

    /// Advance the round by at most one phase
    pub fn step(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        match self.phase {
            ContractNetPhase::Init => self.send_cfp(ctx),
            ContractNetPhase::AwaitProposals => self.collect_proposal(ctx),
            ContractNetPhase::CommitBest => self.commit_best(ctx),
            ContractNetPhase::AwaitOutcome => self.await_outcome(ctx),
            ContractNetPhase::Terminated => Step::Done,
        }
    }

    fn send_cfp(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        info!(agent = %ctx.id(), service = %self.service_type, "Initiating Contract Net protocol");

        self.participants = ctx.search(&self.service_type);
        if self.participants.is_empty() {
            return self.terminate(ctx, NegotiationOutcome::NoProviders);
        }

        let conversation = Conversation::open(cfp_topic(&self.service_type), "cfp");
        let cfp = conversation.stamp(
            ctx.message(Performative::Cfp)
                .with_receivers(self.participants.iter().cloned())
                .with_content(self.service_type.clone()),
        );
        ctx.send(cfp);
        info!(
            agent = %ctx.id(),
            service = %self.service_type,
            participants = self.participants.len(),
            "CFP sent"
        );

        self.conversation = Some(conversation);
        self.phase = ContractNetPhase::AwaitProposals;
        Step::Continue
    }

    fn collect_proposal(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(msg) = self.receive(ctx) else {
            return Step::Block;
        };

        if msg.performative == Performative::Propose {
            let candidate = Proposal {
                provider: msg.sender.clone(),
                offer: msg.content.clone(),
            };
            debug!(provider = %candidate.provider, offer = %candidate.offer, "Proposal received");
            if prefers(self.policy.as_ref(), self.best.as_ref(), &candidate) {
                self.best = Some(candidate);
            }
        } else {
            debug!(sender = %msg.sender, performative = %msg.performative, "Non-proposal reply");
        }

        self.replies_received += 1;
        if self.replies_received == self.participants.len() {
            self.phase = ContractNetPhase::CommitBest;
        }
        Step::Continue
    }

    fn commit_best(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(best) = self.best.clone() else {
            info!(service = %self.service_type, "No agent proposed an offer");
            return self.terminate(ctx, NegotiationOutcome::NoOffers);
        };

        let conversation = Conversation::open(accept_topic(&self.service_type, &best.offer), "accept");
        let accept = conversation.stamp(
            ctx.message(Performative::AcceptProposal)
                .with_receiver(best.provider.clone())
                .with_content(best.offer.clone()),
        );
        ctx.send(accept);
        info!(
            agent = %ctx.id(),
            service = %self.service_type,
            provider = %best.provider,
            offer = %best.offer,
            "ACCEPT PROPOSAL sent"
        );

        self.conversation = Some(conversation);
        self.phase = ContractNetPhase::AwaitOutcome;
        Step::Continue
    }

    fn await_outcome(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(msg) = self.receive(ctx) else {
            return Step::Block;
        };
        let Some(best) = self.best.clone() else {
            return self.terminate(ctx, NegotiationOutcome::NoOffers);
        };

        let outcome = if msg.performative == Performative::Inform {
            NegotiationOutcome::Completed {
                provider: best.provider,
                offer: best.offer,
            }
        } else {
            warn!(
                service = %self.service_type,
                performative = %msg.performative,
                "Service not successfully completed"
            );
            NegotiationOutcome::NotCompleted {
                provider: best.provider,
                offer: best.offer,
            }
        };
        self.terminate(ctx, outcome)
    }

    fn receive(&self, ctx: &AgentContext<'_>) -> Option<AclMessage> {
        let template = self
            .conversation
            .as_ref()
            .map(Conversation::template)
            .unwrap_or(MessageTemplate::Any);
        ctx.receive(&template)
    }

    fn terminate(&mut self, ctx: &AgentContext<'_>, outcome: NegotiationOutcome) -> Step {
        info!(
            agent = %ctx.id(),
            service = %self.service_type,
            outcome = outcome.as_str(),
            replies = self.replies_received,
            "Contract Net protocol terminated"
        );
        record_negotiation(outcome.as_str());
        if let Some(sink) = &self.sink {
            sink.lock().push(outcome.clone());
        }
        self.outcome = Some(outcome);
        self.phase = ContractNetPhase::Terminated;
        Step::Done
    }
}

impl Behavior for ContractNetInitiator {
    fn name(&self) -> &str {
        "contract-net-initiator"
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        self.step(ctx)
    }
}

/// Answers every call for proposals: a fixed offer for one service,
/// a refusal for anything else.
pub struct ProposalResponder {
    service_type: String,
    offer: String,
    template: MessageTemplate,
}

impl ProposalResponder {
    pub fn new(service_type: impl Into<String>, offer: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            offer: offer.into(),
            template: MessageTemplate::match_performative(Performative::Cfp),
        }
    }
}

impl Behavior for ProposalResponder {
    fn name(&self) -> &str {
        "proposal-responder"
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(cfp) = ctx.receive(&self.template) else {
            return Step::Block;
        };

        if cfp.content == self.service_type {
            info!(agent = %ctx.id(), service = %self.service_type, offer = %self.offer, "PROPOSE");
            ctx.reply(&cfp, Performative::Propose, self.offer.clone());
        } else {
            info!(agent = %ctx.id(), service = %cfp.content, "REFUSE");
            ctx.reply(&cfp, Performative::Refuse, NOT_AVAILABLE);
        }
        Step::Continue
    }
}

/// Builds the behavior that carries out an accepted offer
pub type Effect = Box<dyn Fn() -> Box<dyn Behavior> + Send>;

/// Honours accepted proposals for one offer.
///
/// On a matching ACCEPT_PROPOSAL the effect is scheduled on the agent and the
/// initiator is told the work is done; any other offer fails.
pub struct CommitmentResponder {
    offer: String,
    effect: Effect,
    template: MessageTemplate,
}

impl CommitmentResponder {
    pub fn new<F, B>(offer: impl Into<String>, effect: F) -> Self
    where
        F: Fn() -> B + Send + 'static,
        B: Behavior + 'static,
    {
        Self {
            offer: offer.into(),
            effect: Box::new(move || Box::new(effect()) as Box<dyn Behavior>),
            template: MessageTemplate::match_performative(Performative::AcceptProposal),
        }
    }
}

impl Behavior for CommitmentResponder {
    fn name(&self) -> &str {
        "commitment-responder"
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(accept) = ctx.receive(&self.template) else {
            return Step::Block;
        };

        if accept.content == self.offer {
            ctx.add_boxed_behavior((self.effect)());
            info!(agent = %ctx.id(), offer = %self.offer, "INFORM done");
            ctx.reply(&accept, Performative::Inform, INFORM_DONE);
        } else {
            info!(agent = %ctx.id(), offer = %accept.content, "FAIL, offer not available");
            ctx.reply(&accept, Performative::Failure, NOT_AVAILABLE);
        }
        Step::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::behavior::OneShotBehavior;
    use crate::network::MessageBus;
    use crate::platform::DirectoryFacilitator;
    use crate::tools::{MessageSniffer, SnifferConfig};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SERVICE: &str = "increase-illuminance";

    struct Room {
        bus: Arc<MessageBus>,
        df: Arc<DirectoryFacilitator>,
    }

    impl Room {
        fn new() -> Self {
            Self {
                bus: Arc::new(MessageBus::new()),
                df: Arc::new(DirectoryFacilitator::default()),
            }
        }

        fn agent(&self, name: &str) -> Agent {
            Agent::new(AgentId::new(name), self.bus.clone(), self.df.clone())
        }

        /// A participant proposing `offer` and honouring it
        fn participant(&self, name: &str, offer: &str) -> Agent {
            let mut agent = self.agent(name);
            self.df.register(agent.id(), [SERVICE]).unwrap();
            agent.add_behavior(ProposalResponder::new(SERVICE, offer)).unwrap();
            agent
                .add_behavior(CommitmentResponder::new(offer, || {
                    OneShotBehavior::new("effect", |_ctx: &mut AgentContext<'_>| {})
                }))
                .unwrap();
            agent
        }
    }

    fn cloudy(offer: &str) -> bool {
        offer == "turn-on-light"
    }

    /// Run agents in the given order until none of them progresses
    fn settle(agents: &mut [&mut Agent]) {
        for _ in 0..32 {
            let mut progressed = false;
            for agent in agents.iter_mut() {
                progressed |= agent.run_until_idle_at(0, 16).made_progress();
            }
            if !progressed {
                return;
            }
        }
    }

    fn start_round(manager: &mut Agent, policy: fn(&str) -> bool) -> OutcomeSink {
        let sink = OutcomeSink::default();
        manager
            .add_behavior(ContractNetInitiator::new(SERVICE, policy).with_outcome_sink(sink.clone()))
            .unwrap();
        sink
    }

    #[test]
    fn test_no_providers_sends_nothing() {
        let sniffer = Arc::new(MessageSniffer::new(SnifferConfig::default()));
        let room = Room {
            bus: Arc::new(MessageBus::new().with_sniffer(sniffer.clone())),
            df: Arc::new(DirectoryFacilitator::default()),
        };
        let mut manager = room.agent("manager");
        // On the bus but not advertising the service
        let bystander = room.agent("bystander");
        let mut initiator = ContractNetInitiator::new(SERVICE, cloudy);

        let step = manager.with_context(|ctx| initiator.step(ctx));

        assert_eq!(step, Step::Done);
        assert!(initiator.is_done());
        assert_eq!(initiator.outcome(), Some(&NegotiationOutcome::NoProviders));
        assert!(initiator.participants().is_empty());
        assert!(sniffer.is_empty());
        assert_eq!(room.bus.pending(bystander.id()), 0);
        assert_eq!(room.bus.pending(manager.id()), 0);
    }

    #[test]
    fn test_participants_fixed_at_round_start() {
        let room = Room::new();
        let mut manager = room.agent("manager");
        let lamp = room.participant("lamp", "turn-on-light");
        let mut initiator = ContractNetInitiator::new(SERVICE, cloudy);

        manager.with_context(|ctx| initiator.step(ctx));
        assert_eq!(initiator.participants().len(), 1);

        // Advertises after the call for proposals went out
        let late = room.participant("blinds", "raise-blinds");
        assert_eq!(room.df.search(SERVICE).len(), 2);

        let template = MessageTemplate::match_performative(Performative::Cfp);
        let cfp = room.bus.receive(lamp.id(), &template).unwrap();
        room.bus.send(
            cfp.create_reply(lamp.id().clone(), Performative::Propose)
                .with_content("turn-on-light"),
        );
        manager.with_context(|ctx| initiator.step(ctx));

        assert_eq!(initiator.replies_received(), 1);
        assert_eq!(initiator.phase(), ContractNetPhase::CommitBest);
        assert_eq!(initiator.participants().len(), 1);
        assert_eq!(room.bus.pending(late.id()), 0);
    }

    #[test]
    fn test_phase_advances_only_when_all_replied() {
        let room = Room::new();
        let mut manager = room.agent("manager");
        let lamp = room.participant("lamp", "turn-on-light");
        let blinds = room.participant("blinds", "raise-blinds");
        let mut initiator = ContractNetInitiator::new(SERVICE, cloudy);

        manager.with_context(|ctx| initiator.step(ctx));
        assert_eq!(initiator.phase(), ContractNetPhase::AwaitProposals);
        assert_eq!(initiator.participants().len(), 2);

        // Nothing received yet
        assert_eq!(manager.with_context(|ctx| initiator.step(ctx)), Step::Block);

        let template = MessageTemplate::match_performative(Performative::Cfp);
        let cfp_to_lamp = room.bus.receive(lamp.id(), &template).unwrap();
        let cfp_to_blinds = room.bus.receive(blinds.id(), &template).unwrap();
        assert_eq!(cfp_to_lamp.content, SERVICE);
        assert_eq!(cfp_to_lamp.conversation_id.as_deref(), Some("cfp-increase-illuminance"));

        room.bus.send(
            cfp_to_blinds
                .create_reply(blinds.id().clone(), Performative::Refuse)
                .with_content(NOT_AVAILABLE),
        );
        manager.with_context(|ctx| initiator.step(ctx));
        assert_eq!(initiator.replies_received(), 1);
        assert_eq!(initiator.phase(), ContractNetPhase::AwaitProposals);

        // A reply from an unrelated conversation is ignored
        room.bus.send(
            AclMessage::new(Performative::Propose, AgentId::new("stranger"))
                .with_receiver(manager.id().clone())
                .with_conversation_id("cfp-increase-illuminance")
                .with_content("dim-light"),
        );
        assert_eq!(manager.with_context(|ctx| initiator.step(ctx)), Step::Block);

        room.bus.send(
            cfp_to_lamp
                .create_reply(lamp.id().clone(), Performative::Propose)
                .with_content("turn-on-light"),
        );
        manager.with_context(|ctx| initiator.step(ctx));
        assert_eq!(initiator.replies_received(), 2);
        assert_eq!(initiator.phase(), ContractNetPhase::CommitBest);
        assert_eq!(initiator.best().map(|b| b.offer.as_str()), Some("turn-on-light"));
    }

    #[test]
    fn test_cloudy_selects_lamp_in_either_order() {
        for lamp_first in [true, false] {
            let room = Room::new();
            let mut manager = room.agent("manager");
            let mut lamp = room.participant("lamp", "turn-on-light");
            let mut blinds = room.participant("blinds", "raise-blinds");
            let sink = start_round(&mut manager, cloudy);

            manager.run_until_idle_at(0, 4);
            if lamp_first {
                settle(&mut [&mut lamp, &mut blinds, &mut manager]);
            } else {
                settle(&mut [&mut blinds, &mut lamp, &mut manager]);
            }

            assert_eq!(
                sink.lock().as_slice(),
                &[NegotiationOutcome::Completed {
                    provider: AgentId::new("lamp"),
                    offer: "turn-on-light".into(),
                }]
            );
        }
    }

    #[test]
    fn test_all_refusals_end_without_offers() {
        let room = Room::new();
        let mut manager = room.agent("manager");
        let mut lamp = room.agent("lamp");
        room.df.register(lamp.id(), [SERVICE]).unwrap();
        lamp.add_behavior(ProposalResponder::new("decrease-illuminance", "turn-off-light"))
            .unwrap();
        let sink = start_round(&mut manager, cloudy);

        settle(&mut [&mut manager, &mut lamp]);

        assert_eq!(sink.lock().as_slice(), &[NegotiationOutcome::NoOffers]);
    }

    #[test]
    fn test_commitment_failure_is_not_completed() {
        let room = Room::new();
        let mut manager = room.agent("manager");
        let mut lamp = room.agent("lamp");
        room.df.register(lamp.id(), [SERVICE]).unwrap();
        lamp.add_behavior(ProposalResponder::new(SERVICE, "turn-on-light"))
            .unwrap();
        lamp.add_behavior(CommitmentResponder::new("dim-light", || {
            OneShotBehavior::new("effect", |_ctx: &mut AgentContext<'_>| {})
        }))
        .unwrap();
        let sink = start_round(&mut manager, cloudy);

        settle(&mut [&mut manager, &mut lamp]);

        assert_eq!(
            sink.lock().as_slice(),
            &[NegotiationOutcome::NotCompleted {
                provider: AgentId::new("lamp"),
                offer: "turn-on-light".into(),
            }]
        );
    }

    #[test]
    fn test_accepted_offer_schedules_effect() {
        let room = Room::new();
        let mut manager = room.agent("manager");
        let mut blinds = room.agent("blinds");
        room.df.register(blinds.id(), [SERVICE]).unwrap();
        let effects = Arc::new(AtomicUsize::new(0));

        let counter = effects.clone();
        blinds.add_behavior(ProposalResponder::new(SERVICE, "raise-blinds"))
            .unwrap();
        blinds
            .add_behavior(CommitmentResponder::new("raise-blinds", move || {
                let counter = counter.clone();
                OneShotBehavior::new("raise", move |_ctx: &mut AgentContext<'_>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            }))
            .unwrap();
        let sink = start_round(&mut manager, |offer| offer == "raise-blinds");

        settle(&mut [&mut manager, &mut blinds]);

        assert!(sink.lock()[0].is_completed());
        assert_eq!(effects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_proposal_responder_refuses_other_services() {
        let room = Room::new();
        let mut lamp = room.agent("lamp");
        lamp.add_behavior(ProposalResponder::new(SERVICE, "turn-on-light"))
            .unwrap();

        room.bus.send(
            AclMessage::new(Performative::Cfp, AgentId::new("manager"))
                .with_receiver(lamp.id().clone())
                .with_content("make-coffee")
                .with_reply_with("cfp-1"),
        );
        room.bus.register(&AgentId::new("manager"));
        lamp.run_until_idle_at(0, 4);

        let reply = room
            .bus
            .receive(&AgentId::new("manager"), &MessageTemplate::Any)
            .unwrap();
        assert_eq!(reply.performative, Performative::Refuse);
        assert_eq!(reply.content, NOT_AVAILABLE);
        assert_eq!(reply.in_reply_to.as_deref(), Some("cfp-1"));
    }

    fn proposal(index: usize, good: bool) -> Proposal {
        Proposal {
            provider: AgentId::new(format!("p{index}")),
            offer: if good { "good".into() } else { format!("plain-{index}") },
        }
    }

    proptest! {
        #[test]
        fn prop_first_good_offer_else_first_offer(goods in proptest::collection::vec(any::<bool>(), 0..12)) {
            let proposals: Vec<Proposal> = goods
                .iter()
                .enumerate()
                .map(|(i, good)| proposal(i, *good))
                .collect();
            let policy = |offer: &str| offer == "good";

            let expected = proposals
                .iter()
                .find(|p| p.offer == "good")
                .or_else(|| proposals.first())
                .cloned();

            prop_assert_eq!(select_best(&policy, &proposals), expected);
        }
    }
}
