// agent/mod.rs - Agent Container
//
//! An [`Agent`] is one unit of execution: an identity, an inbox, a cached
//! view of the directory and a scheduler of cooperative behaviors. Nothing
//! inside an agent runs in parallel; agents only talk through the bus.
//!
//! Behaviors act through an [`AgentContext`], which lends them the agent's
//! messaging and directory facilities for the duration of one turn.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::acl_message::{AclMessage, AgentId, Performative};
use crate::behavior::{Behavior, BehaviorError, BehaviorScheduler, BehaviorStatus, TurnReport};
use crate::network::{Mailbox, MessageBus};
use crate::platform::{DirectoryFacilitator, ServiceProviders};
use crate::protocol::MessageTemplate;

/// Per-turn view of an agent handed to behaviors
pub struct AgentContext<'a> {
    id: &'a AgentId,
    bus: &'a MessageBus,
    mailbox: &'a Mailbox,
    directory: &'a DirectoryFacilitator,
    providers: &'a mut ServiceProviders,
    now_ms: u64,
    spawned: Vec<Box<dyn Behavior>>,
}

impl<'a> AgentContext<'a> {
    pub fn id(&self) -> &AgentId {
        self.id
    }

    /// Milliseconds on the agent's clock for the current turn
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Non-blocking: take the first queued message matching `template`
    pub fn receive(&self, template: &MessageTemplate) -> Option<AclMessage> {
        self.mailbox.take_first(template)
    }

    /// Start a new message from this agent
    pub fn message(&self, performative: Performative) -> AclMessage {
        AclMessage::new(performative, self.id.clone())
    }

    /// Send a message; the sender is always this agent
    pub fn send(&mut self, mut msg: AclMessage) -> usize {
        msg.sender = self.id.clone();
        trace!(
            agent = %self.id,
            performative = %msg.performative,
            conversation = ?msg.conversation_id,
            receivers = msg.receivers.len(),
            "Sending message"
        );
        self.bus.send(msg)
    }

    /// Reply to `msg` with the given performative and content
    pub fn reply(
        &mut self,
        msg: &AclMessage,
        performative: Performative,
        content: impl Into<String>,
    ) -> usize {
        let reply = msg
            .create_reply(self.id.clone(), performative)
            .with_content(content);
        self.send(reply)
    }

    /// Schedule a new behavior; it starts on the next turn
    pub fn add_behavior(&mut self, behavior: impl Behavior + 'static) {
        self.spawned.push(Box::new(behavior));
    }

    pub fn add_boxed_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.spawned.push(behavior);
    }

    pub fn directory(&self) -> &DirectoryFacilitator {
        self.directory
    }

    /// Search the directory and remember the result
    pub fn search(&mut self, service_type: &str) -> BTreeSet<AgentId> {
        let found = self.directory.search(service_type);
        self.providers.insert(service_type, found.clone());
        found
    }

    /// Providers remembered from earlier searches
    pub fn providers(&self) -> &ServiceProviders {
        self.providers
    }

    fn into_spawned(self) -> Vec<Box<dyn Behavior>> {
        self.spawned
    }
}

/// One agent: identity, inbox, directory cache and behaviors
pub struct Agent {
    id: AgentId,
    bus: Arc<MessageBus>,
    mailbox: Arc<Mailbox>,
    directory: Arc<DirectoryFacilitator>,
    providers: ServiceProviders,
    scheduler: BehaviorScheduler,

    /// Origin of the agent's wall clock
    epoch: Instant,
    /// Clock value of the latest turn
    clock_ms: u64,
    /// Mailbox arrivals already accounted for
    seen_arrivals: u64,
    turns: u64,
}

impl Agent {
    pub fn new(id: AgentId, bus: Arc<MessageBus>, directory: Arc<DirectoryFacilitator>) -> Self {
        let mailbox = bus.register(&id);
        debug!(agent = %id, "Agent created");
        Self {
            id,
            bus,
            mailbox,
            directory,
            providers: ServiceProviders::default(),
            scheduler: BehaviorScheduler::new(),
            epoch: Instant::now(),
            clock_ms: 0,
            seen_arrivals: 0,
            turns: 0,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn providers(&self) -> &ServiceProviders {
        &self.providers
    }

    pub fn scheduler(&self) -> &BehaviorScheduler {
        &self.scheduler
    }

    pub fn behaviors(&self) -> Vec<(u64, String, BehaviorStatus)> {
        self.scheduler.list_behaviors()
    }

    pub fn pending_messages(&self) -> usize {
        self.mailbox.len()
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Milliseconds since the agent was created
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn add_behavior(&mut self, behavior: impl Behavior + 'static) -> Result<u64, BehaviorError> {
        self.add_boxed_behavior(Box::new(behavior))
    }

    pub fn add_boxed_behavior(&mut self, behavior: Box<dyn Behavior>) -> Result<u64, BehaviorError> {
        self.scheduler.add_behavior(behavior, self.clock_ms)
    }

    /// Run `f` against this agent's context outside of the scheduler.
    ///
    /// Behaviors added through the context are scheduled afterwards.
    pub fn with_context<R>(&mut self, f: impl FnOnce(&mut AgentContext<'_>) -> R) -> R {
        let mut ctx = AgentContext {
            id: &self.id,
            bus: &self.bus,
            mailbox: &self.mailbox,
            directory: &self.directory,
            providers: &mut self.providers,
            now_ms: self.clock_ms,
            spawned: Vec::new(),
        };
        let result = f(&mut ctx);
        let spawned = ctx.into_spawned();
        self.schedule_spawned(spawned);
        result
    }

    /// One scheduling turn at the given clock value
    pub fn run_turn_at(&mut self, now_ms: u64) -> TurnReport {
        self.clock_ms = self.clock_ms.max(now_ms);

        let arrivals = self.mailbox.arrivals();
        if arrivals != self.seen_arrivals {
            self.seen_arrivals = arrivals;
            let woken = self.scheduler.restart_blocked();
            if woken > 0 {
                trace!(agent = %self.id, woken, "New mail, restarting blocked behaviors");
            }
        }

        let mut ctx = AgentContext {
            id: &self.id,
            bus: &self.bus,
            mailbox: &self.mailbox,
            directory: &self.directory,
            providers: &mut self.providers,
            now_ms: self.clock_ms,
            spawned: Vec::new(),
        };
        let report = self.scheduler.run_turn(&mut ctx);
        let spawned = ctx.into_spawned();
        self.schedule_spawned(spawned);

        self.turns += 1;
        report
    }

    /// Run turns until nothing makes progress, at most `max_turns`
    pub fn run_until_idle_at(&mut self, now_ms: u64, max_turns: usize) -> TurnReport {
        let mut total = TurnReport::default();
        for _ in 0..max_turns {
            let report = self.run_turn_at(now_ms);
            total.merge(report);
            if !report.made_progress() {
                break;
            }
        }
        total
    }

    /// Run until idle on the agent's wall clock
    pub fn run_until_idle(&mut self, max_turns: usize) -> TurnReport {
        let now = self.elapsed_ms();
        self.run_until_idle_at(now, max_turns)
    }

    /// Withdraw from the directory and the bus
    pub fn shutdown(&mut self) {
        self.directory.deregister(&self.id);
        self.bus.deregister(&self.id);
        debug!(agent = %self.id, "Agent shut down");
    }

    fn schedule_spawned(&mut self, spawned: Vec<Box<dyn Behavior>>) {
        for behavior in spawned {
            let name = behavior.name().to_string();
            if let Err(e) = self.scheduler.add_behavior(behavior, self.clock_ms) {
                warn!(agent = %self.id, behavior = %name, error = %e, "Failed to schedule behavior");
            }
        }
    }
}
