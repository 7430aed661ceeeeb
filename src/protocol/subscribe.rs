// protocol/subscribe.rs - FIPA Subscribe Protocol

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::correlator::{subscribe_topic, Conversation, MessageTemplate};
use crate::acl_message::{AgentId, Performative};
use crate::agent::AgentContext;
use crate::behavior::{Behavior, BehaviorConfig, Step};

/// Subscribe initiator phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribePhase {
    Init,
    AwaitAgreement,
    Terminated,
}

/// How a subscription attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Zero or several providers known for the service
    NoAppropriateProvider,
    Agreed,
    Refused,
}

/// Subscribes to a single-provider service.
///
/// On AGREE the percept handler is scheduled on the agent. The handler is
/// dropped on refusal or when no single provider is known.
pub struct SubscribeInitiator {
    service_type: String,
    phase: SubscribePhase,
    conversation: Option<Conversation>,
    handler: Option<Box<dyn Behavior>>,
    outcome: Option<SubscribeOutcome>,
}

impl SubscribeInitiator {
    pub fn new(service_type: impl Into<String>, handler: impl Behavior + 'static) -> Self {
        Self {
            service_type: service_type.into(),
            phase: SubscribePhase::Init,
            conversation: None,
            handler: Some(Box::new(handler)),
            outcome: None,
        }
    }

    pub fn phase(&self) -> SubscribePhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<SubscribeOutcome> {
        self.outcome
    }

    pub fn is_done(&self) -> bool {
        self.phase == SubscribePhase::Terminated
    }

    pub fn step(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        match self.phase {
            SubscribePhase::Init => self.subscribe(ctx),
            SubscribePhase::AwaitAgreement => self.await_agreement(ctx),
            SubscribePhase::Terminated => Step::Done,
        }
    }

    fn subscribe(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        info!(agent = %ctx.id(), service = %self.service_type, "Initiating Subscribe protocol");

        let Some(provider) = ctx.providers().single(&self.service_type).cloned() else {
            info!(
                service = %self.service_type,
                providers = ctx.providers().count(&self.service_type),
                "No appropriate service provider found"
            );
            return self.terminate(SubscribeOutcome::NoAppropriateProvider);
        };

        let conversation = Conversation::open(subscribe_topic(&self.service_type), "subscribe");
        let msg = conversation.stamp(
            ctx.message(Performative::Subscribe)
                .with_receiver(provider.clone())
                .with_content(self.service_type.clone()),
        );
        ctx.send(msg);
        info!(agent = %ctx.id(), service = %self.service_type, provider = %provider, "SUBSCRIBE sent");

        self.conversation = Some(conversation);
        self.phase = SubscribePhase::AwaitAgreement;
        Step::Continue
    }

    fn await_agreement(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(template) = self.conversation.as_ref().map(Conversation::template) else {
            return self.terminate(SubscribeOutcome::Refused);
        };
        let Some(reply) = ctx.receive(&template) else {
            return Step::Block;
        };

        if reply.performative == Performative::Agree {
            if let Some(handler) = self.handler.take() {
                ctx.add_boxed_behavior(handler);
            }
            self.terminate(SubscribeOutcome::Agreed)
        } else {
            warn!(
                service = %self.service_type,
                performative = %reply.performative,
                "Subscription not accepted"
            );
            self.terminate(SubscribeOutcome::Refused)
        }
    }

    fn terminate(&mut self, outcome: SubscribeOutcome) -> Step {
        info!(service = %self.service_type, ?outcome, "Subscribe protocol terminated");
        self.outcome = Some(outcome);
        self.phase = SubscribePhase::Terminated;
        Step::Done
    }
}

impl Behavior for SubscribeInitiator {
    fn name(&self) -> &str {
        "subscribe-initiator"
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        self.step(ctx)
    }
}

/// Receives percept values delivered to a [`PerceptHandler`]
pub trait PerceptSink: Send {
    fn on_percept(&mut self, ctx: &mut AgentContext<'_>, value: &str);
}

/// Consumes the notifications of one subscription, forever
pub struct PerceptHandler<S> {
    name: String,
    template: MessageTemplate,
    sink: S,
}

impl<S: PerceptSink> PerceptHandler<S> {
    pub fn new(service_type: &str, sink: S) -> Self {
        Self {
            name: format!("percept-{service_type}"),
            template: MessageTemplate::match_performative(Performative::Inform)
                .and(MessageTemplate::match_conversation_id(subscribe_topic(service_type))),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: PerceptSink> Behavior for PerceptHandler<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        match ctx.receive(&self.template) {
            Some(msg) => {
                self.sink.on_percept(ctx, &msg.content);
                Step::Continue
            }
            None => Step::Block,
        }
    }
}

/// Subscribers per notification topic, in subscription order.
///
/// Written by the subscription responder and read by the notification
/// tickers, so every access goes through the lock.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    topics: RwLock<HashMap<String, Vec<AgentId>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; duplicates are ignored.
    ///
    /// Returns true when this is the first subscription to `topic`.
    pub fn add(&self, topic: &str, subscriber: AgentId) -> bool {
        let mut topics = self.topics.write();
        let is_new = !topics.contains_key(topic);
        let subscribers = topics.entry(topic.to_string()).or_default();
        if !subscribers.contains(&subscriber) {
            subscribers.push(subscriber);
        }
        is_new
    }

    pub fn subscribers(&self, topic: &str) -> Vec<AgentId> {
        self.topics.read().get(topic).cloned().unwrap_or_default()
    }

    pub fn topics(&self) -> BTreeSet<String> {
        self.topics.read().keys().cloned().collect()
    }
}

/// Current value of a notification topic
pub trait TopicSource: Send + Sync {
    /// `None` for a topic the source does not know
    fn current_value(&self, topic: &str) -> Option<String>;
}

/// Accepts subscriptions to an allow-list of topics and starts one
/// [`NotificationTicker`] per topic on its first subscriber.
pub struct SubscriptionResponder {
    allowed: BTreeSet<String>,
    registry: Arc<SubscriberRegistry>,
    source: Arc<dyn TopicSource>,
    interval_ms: u64,
    template: MessageTemplate,
}

impl SubscriptionResponder {
    pub fn new<I, S>(
        allowed: I,
        registry: Arc<SubscriberRegistry>,
        source: Arc<dyn TopicSource>,
        interval_ms: u64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            registry,
            source,
            interval_ms,
            template: MessageTemplate::match_performative(Performative::Subscribe),
        }
    }
}

impl Behavior for SubscriptionResponder {
    fn name(&self) -> &str {
        "subscription-responder"
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let Some(msg) = ctx.receive(&self.template) else {
            return Step::Block;
        };
        let topic = msg.content.clone();

        if !self.allowed.contains(&topic) {
            info!(agent = %ctx.id(), topic = %topic, subscriber = %msg.sender, "REFUSE subscription");
            ctx.reply(&msg, Performative::Refuse, topic);
            return Step::Continue;
        }

        info!(agent = %ctx.id(), topic = %topic, subscriber = %msg.sender, "AGREE on subscription");
        ctx.reply(&msg, Performative::Agree, topic.clone());

        if self.registry.add(&topic, msg.sender.clone()) {
            ctx.add_behavior(NotificationTicker::new(
                topic,
                self.registry.clone(),
                self.source.clone(),
                self.interval_ms,
            ));
        }
        Step::Continue
    }
}

/// Periodically notifies every subscriber of one topic
pub struct NotificationTicker {
    name: String,
    topic: String,
    registry: Arc<SubscriberRegistry>,
    source: Arc<dyn TopicSource>,
    interval_ms: u64,
}

impl NotificationTicker {
    pub fn new(
        topic: impl Into<String>,
        registry: Arc<SubscriberRegistry>,
        source: Arc<dyn TopicSource>,
        interval_ms: u64,
    ) -> Self {
        let topic = topic.into();
        Self {
            name: format!("notify-{topic}"),
            topic,
            registry,
            source,
            interval_ms,
        }
    }
}

impl Behavior for NotificationTicker {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> BehaviorConfig {
        BehaviorConfig::ticker(self.interval_ms)
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        let subscribers = self.registry.subscribers(&self.topic);
        if subscribers.is_empty() {
            return Step::Continue;
        }

        let msg = match self.source.current_value(&self.topic) {
            Some(value) => {
                debug!(topic = %self.topic, value = %value, "INFORM");
                ctx.message(Performative::Inform).with_content(value)
            }
            None => {
                warn!(topic = %self.topic, "FAIL, unknown topic");
                ctx.message(Performative::Failure)
                    .with_content(self.topic.clone())
            }
        };

        ctx.send(
            msg.with_receivers(subscribers)
                .with_conversation_id(subscribe_topic(&self.topic)),
        );
        Step::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl_message::AclMessage;
    use crate::agent::Agent;
    use crate::network::MessageBus;
    use crate::platform::DirectoryFacilitator;

    struct FixedSource;

    impl TopicSource for FixedSource {
        fn current_value(&self, topic: &str) -> Option<String> {
            (topic == "read-weather").then(|| "sunny".to_string())
        }
    }

    /// Collects every percept it sees
    struct Recorder(Arc<parking_lot::Mutex<Vec<String>>>);

    impl PerceptSink for Recorder {
        fn on_percept(&mut self, _ctx: &mut AgentContext<'_>, value: &str) {
            self.0.lock().push(value.to_string());
        }
    }

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

        fn environment(&self, registry: Arc<SubscriberRegistry>) -> Agent {
            let mut env = self.agent("env");
            self.df
                .register(env.id(), ["read-weather", "read-illuminance"])
                .unwrap();
            env.add_behavior(SubscriptionResponder::new(
                ["read-weather"],
                registry,
                Arc::new(FixedSource),
                2000,
            ))
            .unwrap();
            env
        }
    }

    fn recorder() -> (Recorder, Arc<parking_lot::Mutex<Vec<String>>>) {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        (Recorder(seen.clone()), seen)
    }

    #[test]
    fn test_registry_suppresses_duplicates() {
        let registry = SubscriberRegistry::new();
        assert!(registry.add("read-weather", AgentId::new("manager")));
        assert!(!registry.add("read-weather", AgentId::new("manager")));
        assert!(!registry.add("read-weather", AgentId::new("observer")));

        assert_eq!(
            registry.subscribers("read-weather"),
            vec![AgentId::new("manager"), AgentId::new("observer")]
        );
        assert!(registry.subscribers("read-illuminance").is_empty());
    }

    #[test]
    fn test_no_provider_terminates_immediately() {
        let room = Room::new();
        let mut manager = room.agent("manager");
        let (sink, _) = recorder();
        let mut initiator = SubscribeInitiator::new("read-weather", PerceptHandler::new("read-weather", sink));

        let step = manager.with_context(|ctx| initiator.step(ctx));

        assert_eq!(step, Step::Done);
        assert_eq!(initiator.outcome(), Some(SubscribeOutcome::NoAppropriateProvider));
    }

    #[test]
    fn test_two_providers_behave_like_none() {
        let room = Room::new();
        room.df.register(&AgentId::new("env"), ["read-weather"]).unwrap();
        room.df.register(&AgentId::new("env-2"), ["read-weather"]).unwrap();
        let mut manager = room.agent("manager");
        manager.with_context(|ctx| ctx.search("read-weather"));

        let (sink, _) = recorder();
        let mut initiator = SubscribeInitiator::new("read-weather", PerceptHandler::new("read-weather", sink));
        manager.with_context(|ctx| initiator.step(ctx));

        assert!(initiator.is_done());
        assert_eq!(initiator.outcome(), Some(SubscribeOutcome::NoAppropriateProvider));
        assert_eq!(room.bus.pending(&AgentId::new("env")), 0);
    }

    #[test]
    fn test_agreed_subscription_delivers_percepts() {
        let room = Room::new();
        let registry = Arc::new(SubscriberRegistry::new());
        let mut env = room.environment(registry.clone());
        let mut manager = room.agent("manager");
        manager.with_context(|ctx| ctx.search("read-weather"));

        let (sink, seen) = recorder();
        manager
            .add_behavior(SubscribeInitiator::new(
                "read-weather",
                PerceptHandler::new("read-weather", sink),
            ))
            .unwrap();

        manager.run_until_idle_at(0, 4);
        env.run_until_idle_at(0, 4);
        assert_eq!(registry.subscribers("read-weather"), vec![AgentId::new("manager")]);

        // Ticker fires on its first turn, then every interval
        env.run_until_idle_at(1, 4);
        manager.run_until_idle_at(1, 8);
        assert_eq!(seen.lock().as_slice(), &["sunny".to_string()]);

        env.run_until_idle_at(1_000, 4);
        manager.run_until_idle_at(1_000, 8);
        assert_eq!(seen.lock().len(), 1);

        env.run_until_idle_at(2_001, 4);
        manager.run_until_idle_at(2_001, 8);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_refused_topic_is_not_registered() {
        let room = Room::new();
        let registry = Arc::new(SubscriberRegistry::new());
        let mut env = room.environment(registry.clone());
        let mut manager = room.agent("manager");
        manager.with_context(|ctx| ctx.search("read-illuminance"));

        let (sink, _) = recorder();
        let mut initiator =
            SubscribeInitiator::new("read-illuminance", PerceptHandler::new("read-illuminance", sink));
        manager.with_context(|ctx| initiator.step(ctx));
        env.run_until_idle_at(0, 4);
        manager.with_context(|ctx| initiator.step(ctx));

        assert_eq!(initiator.outcome(), Some(SubscribeOutcome::Refused));
        assert!(registry.topics().is_empty());
        assert_eq!(env.scheduler().active_count(), 1);
    }

    #[test]
    fn test_unknown_topic_notifies_failure() {
        let room = Room::new();
        let registry = Arc::new(SubscriberRegistry::new());
        registry.add("read-humidity", AgentId::new("manager"));
        room.bus.register(&AgentId::new("manager"));
        let mut env = room.agent("env");
        env.add_behavior(NotificationTicker::new(
            "read-humidity",
            registry,
            Arc::new(FixedSource),
            2000,
        ))
        .unwrap();

        env.run_turn_at(0);

        let msg: AclMessage = room
            .bus
            .receive(&AgentId::new("manager"), &MessageTemplate::Any)
            .unwrap();
        assert_eq!(msg.performative, Performative::Failure);
        assert_eq!(msg.content, "read-humidity");
        assert_eq!(msg.conversation_id.as_deref(), Some("subscribe-read-humidity"));
    }
}
