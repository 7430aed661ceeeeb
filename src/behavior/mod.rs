// behavior/mod.rs - JADE-style Behavior Scheduler
//
//! Behavior scheduling system following JADE patterns.
//!
//! Every agent owns one [`BehaviorScheduler`]. Behaviors are cooperative:
//! each turn the scheduler calls [`Behavior::action`] once on every runnable
//! behavior, and a behavior that has nothing to do returns [`Step::Block`]
//! instead of waiting. Blocked behaviors become runnable again when new mail
//! reaches the agent. All protocol state lives in the behavior value itself,
//! so a behavior resumes exactly where its previous turn left off.
//!
//! # Behavior Types
//!
//! - `OneShot` - Executes once then completes
//! - `Cyclic` - Repeats until it returns [`Step::Done`]
//! - `Ticker` - Executes at fixed intervals
//! - `Waker` - Executes once after delay
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = BehaviorScheduler::new();
//! scheduler.add_behavior(Box::new(TickerBehavior::new("heartbeat", 1000, |ctx| {
//!     tracing::info!(agent = %ctx.id(), "tick");
//! })), 0)?;
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use crate::agent::AgentContext;

/// Behavior type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorType {
    /// Executes once then completes
    OneShot,
    /// Repeats until done, blocking while idle
    Cyclic,
    /// Executes at fixed time intervals
    Ticker,
    /// Executes once after a delay
    Waker,
}

/// Behavior configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Behavior type
    pub behavior_type: Option<BehaviorType>,
    /// Tick interval for ticker behavior (ms)
    pub tick_interval_ms: Option<u64>,
    /// Wake delay for waker behavior (ms)
    pub wake_after_ms: Option<u64>,
}

impl BehaviorConfig {
    pub fn one_shot() -> Self {
        Self {
            behavior_type: Some(BehaviorType::OneShot),
            ..Default::default()
        }
    }

    pub fn cyclic() -> Self {
        Self {
            behavior_type: Some(BehaviorType::Cyclic),
            ..Default::default()
        }
    }

    pub fn ticker(interval_ms: u64) -> Self {
        Self {
            behavior_type: Some(BehaviorType::Ticker),
            tick_interval_ms: Some(interval_ms),
            ..Default::default()
        }
    }

    pub fn waker(delay_ms: u64) -> Self {
        Self {
            behavior_type: Some(BehaviorType::Waker),
            wake_after_ms: Some(delay_ms),
            ..Default::default()
        }
    }
}

/// Behavior execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorStatus {
    /// Behavior is ready to run
    Ready,
    /// Behavior is currently executing
    Running,
    /// Behavior is waiting for new mail
    Blocked,
    /// Behavior has completed
    Done,
}

/// Behavior error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BehaviorError {
    #[error("Behavior not found: {0}")]
    NotFound(u64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outcome of one call to [`Behavior::action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Made progress, run again next turn
    Continue,
    /// Nothing to do until new mail arrives
    Block,
    /// Finished, never schedule again
    Done,
}

/// A unit of cooperative work owned by an agent
pub trait Behavior: Send {
    fn name(&self) -> &str;

    fn config(&self) -> BehaviorConfig {
        BehaviorConfig::cyclic()
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step;
}

/// A registered behavior instance
struct ScheduledBehavior {
    id: u64,
    name: String,
    behavior_type: BehaviorType,
    status: BehaviorStatus,
    config: BehaviorConfig,
    last_run_ms: Option<u64>,
    next_run_ms: Option<u64>,
    run_count: u64,
    task: Box<dyn Behavior>,
}

impl ScheduledBehavior {
    /// Check if behavior should run now
    fn should_run(&self, current_ms: u64) -> bool {
        if self.status != BehaviorStatus::Ready {
            return false;
        }

        match self.behavior_type {
            BehaviorType::OneShot => self.run_count == 0,
            BehaviorType::Cyclic => true,
            BehaviorType::Ticker | BehaviorType::Waker => {
                self.next_run_ms.map(|t| current_ms >= t).unwrap_or(true)
            }
        }
    }

    /// Update after execution
    fn after_run(&mut self, current_ms: u64, step: Step) {
        self.last_run_ms = Some(current_ms);
        self.run_count += 1;
        self.status = BehaviorStatus::Ready;

        if step == Step::Done {
            self.status = BehaviorStatus::Done;
            return;
        }

        match self.behavior_type {
            BehaviorType::OneShot | BehaviorType::Waker => self.status = BehaviorStatus::Done,
            BehaviorType::Ticker => {
                if let Some(interval) = self.config.tick_interval_ms {
                    self.next_run_ms = Some(current_ms + interval);
                }
            }
            BehaviorType::Cyclic => {
                if step == Step::Block {
                    self.status = BehaviorStatus::Blocked;
                }
            }
        }
    }
}

/// What a scheduler turn did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnReport {
    /// Behaviors whose action ran
    pub executed: usize,
    /// Behaviors that ran and did not block
    pub progressed: usize,
    /// Behaviors that finished this turn
    pub completed: usize,
}

impl TurnReport {
    pub fn made_progress(&self) -> bool {
        self.progressed > 0
    }

    pub fn merge(&mut self, other: TurnReport) {
        self.executed += other.executed;
        self.progressed += other.progressed;
        self.completed += other.completed;
    }
}

/// Behavior scheduler managing all behaviors for an agent
#[derive(Default)]
pub struct BehaviorScheduler {
    /// Registered behaviors, run in registration order
    behaviors: BTreeMap<u64, ScheduledBehavior>,
    /// Next behavior ID
    next_id: u64,
    /// Behaviors that have finished and been dropped
    completed: u64,
}

impl BehaviorScheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        Self {
            behaviors: BTreeMap::new(),
            next_id: 1,
            completed: 0,
        }
    }

    /// Add a new behavior
    pub fn add_behavior(
        &mut self,
        task: Box<dyn Behavior>,
        current_ms: u64,
    ) -> Result<u64, BehaviorError> {
        let config = task.config();
        let behavior_type = config.behavior_type.ok_or_else(|| {
            BehaviorError::InvalidConfig("behavior_type is required".to_string())
        })?;

        // Validate config based on type
        let next_run_ms = match behavior_type {
            BehaviorType::Ticker => {
                if config.tick_interval_ms.is_none() {
                    return Err(BehaviorError::InvalidConfig(
                        "tick_interval_ms required for Ticker".to_string(),
                    ));
                }
                // Run immediately the first time
                Some(0)
            }
            BehaviorType::Waker => {
                let delay = config.wake_after_ms.ok_or_else(|| {
                    BehaviorError::InvalidConfig("wake_after_ms required for Waker".to_string())
                })?;
                Some(current_ms + delay)
            }
            BehaviorType::OneShot | BehaviorType::Cyclic => None,
        };

        let id = self.next_id.max(1);
        self.next_id = id + 1;

        let name = task.name().to_string();
        trace!(id, name = %name, ?behavior_type, "Behavior added");

        self.behaviors.insert(
            id,
            ScheduledBehavior {
                id,
                name,
                behavior_type,
                status: BehaviorStatus::Ready,
                config,
                last_run_ms: None,
                next_run_ms,
                run_count: 0,
                task,
            },
        );

        Ok(id)
    }

    /// Remove a behavior
    pub fn remove_behavior(&mut self, id: u64) -> Result<(), BehaviorError> {
        self.behaviors
            .remove(&id)
            .map(|_| ())
            .ok_or(BehaviorError::NotFound(id))
    }

    /// Make every blocked behavior runnable again
    pub fn restart_blocked(&mut self) -> usize {
        let mut woken = 0;
        for behavior in self.behaviors.values_mut() {
            if behavior.status == BehaviorStatus::Blocked {
                behavior.status = BehaviorStatus::Ready;
                woken += 1;
            }
        }
        woken
    }

    /// Get behavior status
    pub fn get_status(&self, id: u64) -> Result<BehaviorStatus, BehaviorError> {
        self.behaviors
            .get(&id)
            .map(|b| b.status)
            .ok_or(BehaviorError::NotFound(id))
    }

    /// Last time a behavior ran and its run count
    pub fn run_info(&self, id: u64) -> Result<(Option<u64>, u64), BehaviorError> {
        self.behaviors
            .get(&id)
            .map(|b| (b.last_run_ms, b.run_count))
            .ok_or(BehaviorError::NotFound(id))
    }

    /// List all behaviors
    pub fn list_behaviors(&self) -> Vec<(u64, String, BehaviorStatus)> {
        self.behaviors
            .values()
            .map(|b| (b.id, b.name.clone(), b.status))
            .collect()
    }

    /// Number of live (not yet finished) behaviors
    pub fn active_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Number of behaviors that finished and were dropped
    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    /// Number of runnable behaviors at `current_ms`
    pub fn runnable_count(&self, current_ms: u64) -> usize {
        self.behaviors
            .values()
            .filter(|b| b.should_run(current_ms))
            .count()
    }

    /// Run one scheduling turn: each runnable behavior acts once.
    ///
    /// Finished behaviors are dropped at the end of the turn.
    pub fn run_turn(&mut self, ctx: &mut AgentContext<'_>) -> TurnReport {
        let current_ms = ctx.now_ms();
        let ids: Vec<u64> = self.behaviors.keys().copied().collect();
        let mut report = TurnReport::default();

        for id in ids {
            let Some(behavior) = self.behaviors.get_mut(&id) else {
                continue;
            };
            if !behavior.should_run(current_ms) {
                continue;
            }

            behavior.status = BehaviorStatus::Running;
            let step = behavior.task.action(ctx);
            behavior.after_run(current_ms, step);

            report.executed += 1;
            if step != Step::Block {
                report.progressed += 1;
            }
        }

        let done: Vec<u64> = self
            .behaviors
            .values()
            .filter(|b| b.status == BehaviorStatus::Done)
            .map(|b| b.id)
            .collect();
        for id in done {
            if let Some(b) = self.behaviors.remove(&id) {
                trace!(id, name = %b.name, runs = b.run_count, "Behavior finished");
            }
            report.completed += 1;
            self.completed += 1;
        }

        report
    }
}

// =============================================================================
// Closure-backed behaviors
// =============================================================================

/// Runs a closure once
pub struct OneShotBehavior<F> {
    name: String,
    task: Option<F>,
}

impl<F> OneShotBehavior<F>
where
    F: FnOnce(&mut AgentContext<'_>) + Send,
{
    pub fn new(name: impl Into<String>, task: F) -> Self {
        Self {
            name: name.into(),
            task: Some(task),
        }
    }
}

impl<F> Behavior for OneShotBehavior<F>
where
    F: FnOnce(&mut AgentContext<'_>) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> BehaviorConfig {
        BehaviorConfig::one_shot()
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        if let Some(task) = self.task.take() {
            task(ctx);
        }
        Step::Done
    }
}

/// Runs a closure once, after a delay
pub struct WakerBehavior<F> {
    name: String,
    delay_ms: u64,
    task: Option<F>,
}

impl<F> WakerBehavior<F>
where
    F: FnOnce(&mut AgentContext<'_>) + Send,
{
    pub fn new(name: impl Into<String>, delay_ms: u64, task: F) -> Self {
        Self {
            name: name.into(),
            delay_ms,
            task: Some(task),
        }
    }
}

impl<F> Behavior for WakerBehavior<F>
where
    F: FnOnce(&mut AgentContext<'_>) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> BehaviorConfig {
        BehaviorConfig::waker(self.delay_ms)
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        if let Some(task) = self.task.take() {
            task(ctx);
        }
        Step::Done
    }
}

/// Runs a closure on a fixed interval, forever
pub struct TickerBehavior<F> {
    name: String,
    interval_ms: u64,
    task: F,
}

impl<F> TickerBehavior<F>
where
    F: FnMut(&mut AgentContext<'_>) + Send,
{
    pub fn new(name: impl Into<String>, interval_ms: u64, task: F) -> Self {
        Self {
            name: name.into(),
            interval_ms,
            task,
        }
    }
}

impl<F> Behavior for TickerBehavior<F>
where
    F: FnMut(&mut AgentContext<'_>) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> BehaviorConfig {
        BehaviorConfig::ticker(self.interval_ms)
    }

    fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
        (self.task)(ctx);
        Step::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl_message::{AgentId, Performative};
    use crate::agent::Agent;
    use crate::network::MessageBus;
    use crate::platform::DirectoryFacilitator;
    use crate::protocol::MessageTemplate;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        runs: Arc<AtomicUsize>,
        config: BehaviorConfig,
        step: Step,
    }

    impl Behavior for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn config(&self) -> BehaviorConfig {
            self.config.clone()
        }

        fn action(&mut self, _ctx: &mut AgentContext<'_>) -> Step {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.step
        }
    }

    /// Waits for one INFORM, then finishes
    struct AwaitInform;

    impl Behavior for AwaitInform {
        fn name(&self) -> &str {
            "await-inform"
        }

        fn action(&mut self, ctx: &mut AgentContext<'_>) -> Step {
            match ctx.receive(&MessageTemplate::match_performative(Performative::Inform)) {
                Some(_) => Step::Done,
                None => Step::Block,
            }
        }
    }

    fn test_agent() -> (Agent, Arc<MessageBus>) {
        let bus = Arc::new(MessageBus::new());
        let agent = Agent::new(
            AgentId::new("tester"),
            bus.clone(),
            Arc::new(DirectoryFacilitator::default()),
        );
        (agent, bus)
    }

    fn counting(config: BehaviorConfig, step: Step) -> (Box<dyn Behavior>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let behavior = Counting {
            runs: runs.clone(),
            config,
            step,
        };
        (Box::new(behavior), runs)
    }

    #[test]
    fn test_one_shot_behavior() {
        let (mut agent, _bus) = test_agent();
        let (behavior, runs) = counting(BehaviorConfig::one_shot(), Step::Continue);
        let id = agent.add_boxed_behavior(behavior).unwrap();

        let report = agent.run_turn_at(0);
        assert_eq!(report.executed, 1);
        assert_eq!(report.completed, 1);

        agent.run_turn_at(10);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(agent.scheduler().get_status(id), Err(BehaviorError::NotFound(id)));
    }

    #[test]
    fn test_ticker_behavior() {
        let (mut agent, _bus) = test_agent();
        let (behavior, runs) = counting(BehaviorConfig::ticker(100), Step::Continue);
        let id = agent.add_boxed_behavior(behavior).unwrap();

        // Runs immediately
        agent.run_turn_at(0);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Not again before the interval elapses
        agent.run_turn_at(50);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        agent.run_turn_at(100);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(agent.scheduler().run_info(id).unwrap(), (Some(100), 2));
    }

    #[test]
    fn test_waker_behavior() {
        let (mut agent, _bus) = test_agent();
        agent.run_turn_at(1_000);
        let (behavior, runs) = counting(BehaviorConfig::waker(500), Step::Continue);
        agent.add_boxed_behavior(behavior).unwrap();

        agent.run_turn_at(1_499);
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        agent.run_turn_at(1_500);
        agent.run_turn_at(3_000);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(agent.scheduler().active_count(), 0);
    }

    #[test]
    fn test_blocked_behavior_wakes_on_mail() {
        let (mut agent, bus) = test_agent();
        let id = agent.add_behavior(AwaitInform).unwrap();

        agent.run_turn_at(0);
        assert_eq!(agent.scheduler().get_status(id).unwrap(), BehaviorStatus::Blocked);

        // Blocked behaviors are skipped while nothing arrives
        let report = agent.run_turn_at(1);
        assert_eq!(report.executed, 0);

        bus.send(
            crate::acl_message::AclMessage::new(Performative::Inform, AgentId::new("env"))
                .with_receiver(AgentId::new("tester")),
        );
        let report = agent.run_turn_at(2);
        assert_eq!(report.executed, 1);
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn test_invalid_config() {
        let (behavior, _) = counting(
            BehaviorConfig {
                behavior_type: Some(BehaviorType::Ticker),
                ..Default::default()
            },
            Step::Continue,
        );
        let mut scheduler = BehaviorScheduler::new();
        assert!(matches!(
            scheduler.add_behavior(behavior, 0),
            Err(BehaviorError::InvalidConfig(_))
        ));

        let (behavior, _) = counting(BehaviorConfig::default(), Step::Continue);
        assert!(scheduler.add_behavior(behavior, 0).is_err());
        assert_eq!(scheduler.remove_behavior(7), Err(BehaviorError::NotFound(7)));
    }
}
