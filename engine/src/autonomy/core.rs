//! Autonomous control loop
//!
//! Runs a fixed sequence of steps every tick:
//!
//! 1. Drain queued human interruptions (if the current phase allows)
//! 2. Refresh the phase from the local hour
//! 3. Evaluate goals and possibly generate an emergent one
//! 4. Make one decision and execute its action
//! 5. Fire due behaviors and execute their actions
//! 6. Update metrics
//! 7. Self-reflect every few ticks
//!
//! Every action passes through [`AutonomousLoop::submit_action`]: the
//! concurrency limit is checked, the policy engine is consulted, and only an
//! approved action reaches its executor. The action is removed from the
//! active set on every exit path.
//!
//! Ticks never overlap. Between ticks the loop sleeps for whatever is left
//! of the tick interval, or a full interval after a failed tick.
//!
//! Panics are contained at three boundaries: an executor panic fails only
//! its action, a behavior panic fails only that behavior, and any other
//! panic fails the tick, which the loop counts before carrying on.

use futures::FutureExt;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use sdk::channel::InteractionChannel;
use sdk::errors::EngineError;
use sdk::types::{
    Action, ActionStatus, AgentProfile, DecisionContext, ExecutionResult, Goal, InteractionEvent,
};

use super::behavior::{Behavior, BehaviorInfo, BehaviorRegistry, EmotionState, TriggerContext};
use super::curiosity::CuriosityModel;
use super::decision::{Decision, DecisionEngine};
use super::goals::{GoalEvaluator, GoalManager};
use super::interruption::InterruptionQueue;
use super::metrics::{LoopMetrics, ReflectionSummary};
use super::phase::{Phase, PhaseSchedule};
use crate::clock::Clock;
use crate::config::{AutonomyConfig, Config};
use crate::ethics::{evaluate_or_deny, EthicalEvaluation, EthicsEngine, EthicsStats};
use crate::executors::ExecutorRegistry;
use crate::interaction::LoggingChannel;
use crate::message_bus::{Event, EventType, MessageBus};

/// Source tag on published events
const EVENT_SOURCE: &str = "autonomous_loop";

/// Tag the loop registers its interruption callback under
const INTERRUPTION_TAG: &str = "autonomous_loop";

/// Collaborators the loop is wired to
pub struct LoopDependencies {
    pub ethics: Arc<EthicsEngine>,
    pub executors: Arc<ExecutorRegistry>,
    pub channel: Arc<dyn InteractionChannel>,
    pub bus: Arc<MessageBus>,
    pub clock: Arc<dyn Clock>,
}

impl LoopDependencies {
    /// Built-in collaborators: logging executors, logging channel, a fresh bus
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        Ok(Self {
            ethics: Arc::new(EthicsEngine::new(&config.ethics, Arc::clone(&clock))?),
            executors: Arc::new(ExecutorRegistry::with_logging_defaults()),
            channel: Arc::new(LoggingChannel::new()),
            bus: Arc::new(MessageBus::new()),
            clock,
        })
    }
}

/// Final state of an action handed to the loop
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub action: Action,
    /// `None` when the policy gate is disabled
    pub evaluation: Option<EthicalEvaluation>,
}

impl ActionReport {
    pub fn denied(&self) -> bool {
        self.evaluation.as_ref().is_some_and(|e| !e.allowed)
    }

    pub fn succeeded(&self) -> bool {
        self.action.status == ActionStatus::Completed
    }
}

/// Introspection snapshot
#[derive(Debug, Clone, Serialize)]
pub struct AutonomousState {
    pub agent_id: String,
    pub running: bool,
    pub current_phase: Option<String>,
    pub goals: usize,
    pub active_actions: usize,
    pub queued_interruptions: usize,
    pub behaviors: usize,
    pub metrics: LoopMetrics,
    pub ethics: EthicsStats,
    pub interactions: serde_json::Value,
}

/// Removes an action from the active set when dropped
struct ActiveSlot<'a> {
    active: &'a Mutex<HashMap<String, Action>>,
    id: String,
}

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.id);
    }
}

pub struct AutonomousLoop {
    agent: AgentProfile,
    config: AutonomyConfig,
    schedule: PhaseSchedule,

    clock: Arc<dyn Clock>,
    ethics: Arc<EthicsEngine>,
    executors: Arc<ExecutorRegistry>,
    channel: Arc<dyn InteractionChannel>,
    bus: Arc<MessageBus>,

    running: AtomicBool,
    wake: Notify,
    tick_lock: tokio::sync::Mutex<()>,
    handle: Mutex<Option<JoinHandle<()>>>,

    interruptions: InterruptionQueue,
    active: Mutex<HashMap<String, Action>>,
    current_phase: Mutex<Option<Phase>>,
    goals: Mutex<GoalManager>,
    decisions: Mutex<DecisionEngine>,
    behaviors: Mutex<BehaviorRegistry>,
    curiosity: Mutex<CuriosityModel>,
    emotion: Mutex<Option<EmotionState>>,
    /// Event types published since the current tick began
    published: Mutex<Vec<EventType>>,
    metrics: Mutex<LoopMetrics>,
    rng: Mutex<StdRng>,
}

impl AutonomousLoop {
    /// Build a stopped loop, seeded with the configured initial goals
    pub fn new(config: &Config, deps: LoopDependencies) -> Self {
        let autonomy = config.autonomy.clone();

        let mut goals = GoalManager::new(autonomy.max_goals);
        for initial in &autonomy.goals {
            if !goals.add_goal(initial.to_goal()) {
                warn!(
                    "Goal cap {} reached, initial goal '{}' dropped",
                    autonomy.max_goals, initial.description
                );
            }
        }

        Self {
            agent: config.agent_profile(),
            schedule: PhaseSchedule::default_day(),
            clock: deps.clock,
            ethics: deps.ethics,
            executors: deps.executors,
            channel: deps.channel,
            bus: deps.bus,
            running: AtomicBool::new(false),
            wake: Notify::new(),
            tick_lock: tokio::sync::Mutex::new(()),
            handle: Mutex::new(None),
            interruptions: InterruptionQueue::new(),
            active: Mutex::new(HashMap::new()),
            current_phase: Mutex::new(None),
            goals: Mutex::new(goals),
            decisions: Mutex::new(DecisionEngine::new(autonomy.decision_cooldown_ms)),
            behaviors: Mutex::new(BehaviorRegistry::with_defaults()),
            curiosity: Mutex::new(CuriosityModel::from_config(&config.curiosity)),
            emotion: Mutex::new(None),
            published: Mutex::new(Vec::new()),
            metrics: Mutex::new(LoopMetrics::default()),
            rng: Mutex::new(StdRng::from_entropy()),
            config: autonomy,
        }
    }

    pub fn with_schedule(mut self, schedule: PhaseSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Make random draws (curiosity signals, template choice, state
    /// triggers) reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_goal_evaluator(mut self, evaluator: Arc<dyn GoalEvaluator>) -> Self {
        let goals = self.goals.into_inner().with_evaluator(evaluator);
        self.goals = Mutex::new(goals);
        self
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Start the loop in a background task
    ///
    /// Registers the interruption callback with the channel, starts the
    /// channel and publishes `LoopStarted`. Does nothing when autonomy is
    /// disabled or the loop is already running.
    pub async fn start(self: &Arc<Self>) -> Result<(), EngineError> {
        if !self.config.enabled {
            info!("Autonomy disabled in configuration, loop not started");
            return Ok(());
        }
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Control loop already running");
            return Ok(());
        }

        let queue = self.interruptions.clone();
        self.channel.register_interruption_callback(
            INTERRUPTION_TAG,
            Arc::new(move |event: InteractionEvent| queue.push_back(event)),
        );
        if let Err(e) = self.channel.start().await {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run().await });
        *self.handle.lock() = Some(handle);

        info!(
            "Control loop started for agent {} (tick every {}ms)",
            self.agent.id, self.config.tick_interval_ms
        );
        self.publish(Event::LoopStarted {
            agent_id: self.agent.id.clone(),
        })
        .await;
        Ok(())
    }

    /// Stop the loop and wait for active actions to finish
    ///
    /// # Errors
    ///
    /// Returns `ShutdownTimeout` with the number of actions still active if
    /// they did not drain within `shutdown_timeout_secs`. The loop is
    /// stopped either way.
    pub async fn stop(&self) -> Result<(), EngineError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Stopping control loop");
        self.wake.notify_one();

        let drained = self.wait_for_drain().await;

        let handle = self.handle.lock().take();
        if let Some(mut handle) = handle {
            let grace = Duration::from_millis(self.config.tick_interval_ms.max(self.config.shutdown_poll_ms));
            if timeout(grace, &mut handle).await.is_err() {
                warn!("Control loop task did not exit in time, aborting it");
                handle.abort();
            }
        }

        if let Err(e) = self.channel.stop().await {
            warn!("Failed to stop interaction channel: {}", e);
        }

        self.publish(Event::LoopStopped {
            agent_id: self.agent.id.clone(),
        })
        .await;
        info!("Control loop stopped");
        drained
    }

    async fn wait_for_drain(&self) -> Result<(), EngineError> {
        let limit = Duration::from_secs(self.config.shutdown_timeout_secs);
        let poll = Duration::from_millis(self.config.shutdown_poll_ms);

        let waited = timeout(limit, async {
            loop {
                let empty = self.active.lock().is_empty();
                if empty {
                    break;
                }
                tokio::time::sleep(poll).await;
            }
        })
        .await;

        match waited {
            Ok(()) => Ok(()),
            Err(_) => {
                let remaining = self.active.lock().len();
                warn!(
                    "Timeout waiting for {} active action(s), proceeding with shutdown",
                    remaining
                );
                Err(EngineError::ShutdownTimeout(remaining))
            }
        }
    }

    async fn run(self: Arc<Self>) {
        let interval = Duration::from_millis(self.config.tick_interval_ms);

        while self.running.load(Ordering::SeqCst) {
            let started = Instant::now();
            let pause = match self.tick().await {
                Ok(()) => interval.saturating_sub(started.elapsed()),
                Err(e) => {
                    error!("Tick failed: {}", e);
                    self.metrics.lock().tick_failures += 1;
                    interval
                }
            };

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.wake.notified() => {}
            }
        }
        debug!("Control loop exited");
    }

    // ---------------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------------

    /// Run one full iteration of the loop
    ///
    /// # Errors
    ///
    /// Returns `Panicked` if a step panicked. Actions already admitted in
    /// this tick are removed from the active set.
    pub async fn tick(&self) -> Result<(), EngineError> {
        let _tick = self.tick_lock.lock().await;
        AssertUnwindSafe(self.tick_steps())
            .catch_unwind()
            .await
            .map_err(EngineError::from_panic)
    }

    async fn tick_steps(&self) {
        let started = Instant::now();
        self.published.lock().clear();

        let phase = self.phase_or_lookup();
        self.drain_interruptions(&phase).await;

        let phase = self.refresh_phase().await;
        let curiosity = self.curiosity_score();
        self.update_goals(curiosity).await;

        if let Some(decision) = self.decide_in(&phase) {
            if let Err(e) = self.submit_action(decision.chosen).await {
                warn!("Decided action not executed: {}", e);
            }
        }

        self.run_behaviors(&phase, curiosity).await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.lock().record_tick(elapsed_ms);
        self.maybe_reflect();

        debug!("Tick finished in {}ms (phase {})", elapsed_ms, phase.name);
    }

    async fn drain_interruptions(&self, phase: &Phase) {
        if !self.config.interruptible {
            return;
        }

        while let Some(event) = self.interruptions.pop_front() {
            if !phase.can_interrupt {
                self.interruptions.push_front(event);
                let deferrals = {
                    let mut metrics = self.metrics.lock();
                    metrics.interruptions_deferred += 1;
                    metrics.consecutive_deferrals += 1;
                    metrics.consecutive_deferrals
                };
                debug!(
                    "Phase '{}' cannot be interrupted, {} interruption(s) wait (deferred {} tick(s))",
                    phase.name,
                    self.interruptions.len(),
                    deferrals
                );
                break;
            }

            self.metrics.lock().consecutive_deferrals = 0;
            let outcome = self
                .channel
                .process_interaction(&event.human_id, &event.content, event.kind)
                .await;

            let (handled, response) = match outcome {
                Ok(response) => {
                    self.metrics.lock().interruptions_handled += 1;
                    (true, Some(response))
                }
                Err(e) => {
                    warn!("Interaction from {} could not be handled: {}", event.human_id, e);
                    (false, None)
                }
            };
            self.publish(Event::HumanInteraction {
                event,
                handled,
                response,
            })
            .await;
        }
    }

    fn phase_or_lookup(&self) -> Phase {
        let current = self.current_phase.lock().clone();
        current.unwrap_or_else(|| self.schedule.phase_for_hour(self.clock.local_hour()).clone())
    }

    async fn refresh_phase(&self) -> Phase {
        let phase = self.schedule.phase_for_hour(self.clock.local_hour()).clone();

        let previous = {
            let mut current = self.current_phase.lock();
            let previous = current.as_ref().map(|p| p.name.clone());
            if previous.as_deref() != Some(phase.name.as_str()) {
                *current = Some(phase.clone());
            }
            previous
        };

        if previous.as_deref() != Some(phase.name.as_str()) {
            info!(
                "Phase change: {} -> {}",
                previous.as_deref().unwrap_or("none"),
                phase.name
            );
            self.metrics.lock().phase_changes += 1;
            self.publish(Event::PhaseChange {
                phase: phase.name.clone(),
                activities: phase.activities.clone(),
            })
            .await;
        }

        phase
    }

    fn curiosity_score(&self) -> f64 {
        let model = self.curiosity.lock();
        let mut rng = self.rng.lock();
        model.score(&mut *rng)
    }

    async fn update_goals(&self, curiosity: f64) {
        let generated = {
            let mut goals = self.goals.lock();
            goals.evaluate_all();

            if !self.config.goal_generation_enabled || !goals.has_capacity() {
                None
            } else if curiosity < self.config.curiosity_weight {
                debug!(
                    "Curiosity {:.2} below {:.2}, no emergent goal",
                    curiosity, self.config.curiosity_weight
                );
                None
            } else {
                let mut rng = self.rng.lock();
                goals.generate_emergent(&self.agent, &mut *rng)
            }
        };

        if let Some(goal) = generated {
            self.metrics.lock().goals_generated += 1;
            self.publish(Event::GoalGenerated { goal }).await;
        }
    }

    /// Make an autonomous decision for the current phase
    ///
    /// Returns `None` within the decision cooldown or when the phase offers
    /// no activities.
    pub fn make_decision(&self) -> Option<Decision> {
        let phase = self.phase_or_lookup();
        self.decide_in(&phase)
    }

    fn decide_in(&self, phase: &Phase) -> Option<Decision> {
        let context = self.decision_context(phase);
        let decision = self
            .decisions
            .lock()
            .decide(self.clock.now(), &self.agent, phase, context)?;

        self.metrics.lock().decisions_made += 1;
        info!(
            "Decided on '{}' (confidence {:.2})",
            decision.chosen.verb, decision.confidence
        );
        Some(decision)
    }

    fn decision_context(&self, phase: &Phase) -> DecisionContext {
        let goals = self.goals.lock().goals().to_vec();
        let active = self.active.lock().len();
        let emotion = self.emotion.lock().clone();

        DecisionContext::new(self.config.planning_horizon_ms)
            .with_state("phase", json!(phase.name))
            .with_state("hour", json!(self.clock.local_hour()))
            .with_state("active_actions", json!(active))
            .with_state("queued_interruptions", json!(self.interruptions.len()))
            .with_state("emotion", json!(emotion))
            .with_goals(goals)
    }

    async fn run_behaviors(&self, phase: &Phase, curiosity: f64) {
        let now_ms = self.clock.now_millis();
        let published = self.published.lock().clone();
        let goals = self.goals.lock().goals().to_vec();
        let emotion = self.emotion.lock().clone();

        let ctx = TriggerContext {
            hour: self.clock.local_hour(),
            phase: &phase.name,
            published: &published,
            curiosity,
            emotion: emotion.as_ref(),
            goals: &goals,
            autonomy_level: self.config.autonomy_level,
        };

        let due = {
            let registry = self.behaviors.lock();
            let mut rng = self.rng.lock();
            registry.due(now_ms, &ctx, &mut *rng)
        };

        for behavior in due {
            self.behaviors.lock().mark_executed(&behavior.id, now_ms);

            let produced = std::panic::catch_unwind(AssertUnwindSafe(|| behavior.produce(&ctx)))
                .unwrap_or_else(|payload| Err(EngineError::from_panic(payload)));
            let actions = match produced {
                Ok(actions) => actions,
                Err(e) => {
                    self.metrics.lock().behavior_failures += 1;
                    let err = EngineError::Behavior {
                        id: behavior.id.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                    continue;
                }
            };

            self.metrics.lock().behaviors_fired += 1;
            info!("Behavior '{}' fired with {} action(s)", behavior.id, actions.len());

            let count = actions.len();
            for action in actions {
                if let Err(e) = self.submit_action(action).await {
                    warn!("Action from behavior '{}' not executed: {}", behavior.id, e);
                }
            }
            self.publish(Event::BehaviorTriggered {
                behavior_id: behavior.id.clone(),
                actions: count,
            })
            .await;
        }
    }

    fn maybe_reflect(&self) {
        let every = self.config.reflection_interval_ticks;
        if every == 0 {
            return;
        }

        let active_goals = self.goals.lock().len();
        let mut metrics = self.metrics.lock();
        if metrics.ticks == 0 || metrics.ticks % every != 0 {
            return;
        }

        let summary = ReflectionSummary::from_metrics(
            self.clock.now(),
            &metrics,
            active_goals,
            self.config.tick_interval_ms,
        );
        info!(
            "Reflection after {} ticks: success rate {:.2}, avg tick {:.1}ms, {} goal(s){}",
            summary.ticks,
            summary.success_rate,
            summary.average_tick_ms,
            summary.active_goals,
            if summary.notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", summary.notes.join("; "))
            }
        );
        metrics.last_reflection = Some(summary);
    }

    // ---------------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------------

    /// Run an action through the concurrency limit, the policy gate and its
    /// executor
    ///
    /// A denial or an executor failure is reported in the returned
    /// [`ActionReport`] with the action `Failed`.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyLimit` if `max_concurrent_actions` actions are
    /// already active; the action is not added to the active set.
    pub async fn submit_action(&self, mut action: Action) -> Result<ActionReport, EngineError> {
        let limit = self.config.max_concurrent_actions;
        let admitted = {
            let mut active = self.active.lock();
            if active.len() >= limit {
                Err(active.len())
            } else {
                action.status = ActionStatus::Executing;
                active.insert(action.id.clone(), action.clone());
                Ok(())
            }
        };
        if let Err(count) = admitted {
            self.metrics.lock().actions_rejected += 1;
            warn!(
                "Rejecting '{}': {}/{} actions already active",
                action.verb, count, limit
            );
            return Err(EngineError::ConcurrencyLimit {
                active: count,
                limit,
            });
        }
        let _slot = ActiveSlot {
            active: &self.active,
            id: action.id.clone(),
        };

        let evaluation = if self.config.ethical_constraints {
            let ctx = self.decision_context(&self.phase_or_lookup());
            let evaluation = evaluate_or_deny(&self.ethics, &self.agent, &action, &ctx);

            if !evaluation.allowed {
                action.status = ActionStatus::Failed;
                action.result = Some(ExecutionResult::failure(format!(
                    "Denied by policy: {}",
                    evaluation.reasoning.join("; ")
                )));
                self.metrics.lock().actions_denied += 1;
                warn!(
                    "Action '{}' denied ({} violation(s))",
                    action.verb,
                    evaluation.violations.len()
                );
                self.publish(Event::EthicsViolation {
                    action: action.clone(),
                    evaluation: evaluation.clone(),
                })
                .await;
                return Ok(ActionReport {
                    action,
                    evaluation: Some(evaluation),
                });
            }
            Some(evaluation)
        } else {
            None
        };

        let dispatched = AssertUnwindSafe(self.executors.dispatch(&action))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(EngineError::from_panic(payload)));
        let result = match dispatched {
            Ok(result) => result,
            Err(e) => {
                warn!("Executor failed for '{}': {}", action.verb, e);
                ExecutionResult::failure(e.to_string())
            }
        };

        action.status = if result.success {
            ActionStatus::Completed
        } else {
            ActionStatus::Failed
        };
        action.result = Some(result.clone());
        {
            let mut metrics = self.metrics.lock();
            metrics.actions_executed += 1;
            if result.success {
                metrics.actions_succeeded += 1;
            } else {
                metrics.actions_failed += 1;
            }
        }

        self.publish(Event::ActionCompleted {
            action: action.clone(),
            result,
        })
        .await;

        Ok(ActionReport { action, evaluation })
    }

    async fn publish(&self, event: Event) {
        self.published.lock().push(event.event_type());
        self.bus.publish(EVENT_SOURCE, event).await;
    }

    // ---------------------------------------------------------------------
    // Inputs and introspection
    // ---------------------------------------------------------------------

    /// Queue a human interaction for the next drain
    pub fn queue_interruption(&self, event: InteractionEvent) {
        debug!("Queued interruption from {}", event.human_id);
        self.interruptions.push_back(event);
    }

    pub fn interruption_queue(&self) -> InterruptionQueue {
        self.interruptions.clone()
    }

    pub fn add_goal(&self, goal: Goal) -> bool {
        self.goals.lock().add_goal(goal)
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.goals.lock().goals().to_vec()
    }

    pub fn update_goal_progress(&self, goal_id: &str, progress: f64) -> bool {
        self.goals.lock().update_progress(goal_id, progress)
    }

    pub fn set_emotion(&self, emotion: Option<EmotionState>) {
        *self.emotion.lock() = emotion;
    }

    /// Report an observed curiosity signal for a driver
    pub fn observe_curiosity(&self, driver: &str, signal: f64) {
        self.curiosity.lock().observe(driver, signal);
    }

    pub fn register_behavior(&self, behavior: Behavior) {
        info!("Registered behavior '{}'", behavior.id);
        self.behaviors.lock().register(behavior);
    }

    pub fn unregister_behavior(&self, id: &str) -> bool {
        self.behaviors.lock().unregister(id)
    }

    pub fn set_behavior_enabled(&self, id: &str, enabled: bool) -> Result<(), EngineError> {
        self.behaviors.lock().set_enabled(id, enabled)
    }

    pub fn behaviors(&self) -> Vec<BehaviorInfo> {
        self.behaviors.lock().list()
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.current_phase.lock().clone()
    }

    pub fn schedule(&self) -> &PhaseSchedule {
        &self.schedule
    }

    pub fn active_actions(&self) -> Vec<Action> {
        self.active.lock().values().cloned().collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn agent(&self) -> &AgentProfile {
        &self.agent
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn ethics(&self) -> &Arc<EthicsEngine> {
        &self.ethics
    }

    pub fn metrics(&self) -> LoopMetrics {
        self.metrics.lock().clone()
    }

    pub fn snapshot(&self) -> AutonomousState {
        let current_phase = self.current_phase.lock().as_ref().map(|p| p.name.clone());
        let goals = self.goals.lock().len();
        let active_actions = self.active.lock().len();
        let behaviors = self.behaviors.lock().len();

        AutonomousState {
            agent_id: self.agent.id.clone(),
            running: self.is_running(),
            current_phase,
            goals,
            active_actions,
            queued_interruptions: self.interruptions.len(),
            behaviors,
            metrics: self.metrics(),
            ethics: self.ethics.stats(),
            interactions: self.channel.interaction_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use sdk::types::{ActionCategory, InteractionKind};

    fn test_loop(hour: u32, config: Config) -> (AutonomousLoop, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_hour(hour));
        let deps = LoopDependencies::from_config(&config, clock.clone()).unwrap();
        (AutonomousLoop::new(&config, deps).with_seed(5), clock)
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.autonomy.goal_generation_enabled = false;
        config
    }

    #[tokio::test]
    async fn test_first_tick_sets_phase() {
        let (agent_loop, _) = test_loop(10, quiet_config());
        agent_loop.tick().await.unwrap();

        let state = agent_loop.snapshot();
        assert_eq!(state.current_phase.as_deref(), Some("learning_session"));
        assert_eq!(state.metrics.ticks, 1);
        assert_eq!(state.metrics.phase_changes, 1);
        assert_eq!(state.metrics.decisions_made, 1);
        assert_eq!(state.active_actions, 0);
    }

    #[tokio::test]
    async fn test_interruption_handled_in_interruptible_phase() {
        let (agent_loop, _) = test_loop(10, quiet_config());
        agent_loop.tick().await.unwrap();

        agent_loop.queue_interruption(InteractionEvent::new("h1", "hi", InteractionKind::Message));
        agent_loop.tick().await.unwrap();

        let state = agent_loop.snapshot();
        assert_eq!(state.queued_interruptions, 0);
        assert_eq!(state.metrics.interruptions_handled, 1);
    }

    #[tokio::test]
    async fn test_interruption_waits_during_rest() {
        let (agent_loop, _) = test_loop(23, quiet_config());
        agent_loop.queue_interruption(InteractionEvent::new("h1", "first", InteractionKind::Message));
        agent_loop.queue_interruption(InteractionEvent::new("h1", "second", InteractionKind::Message));

        agent_loop.tick().await.unwrap();
        agent_loop.tick().await.unwrap();

        let queue = agent_loop.interruption_queue();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_front().unwrap().content, "first");
        assert_eq!(agent_loop.metrics().consecutive_deferrals, 2);
    }

    #[tokio::test]
    async fn test_denied_action_fails() {
        let mut config = quiet_config();
        config.ethics.prohibited_actions = vec!["delete_system_files".to_string()];
        let (agent_loop, _) = test_loop(10, config);

        let report = agent_loop
            .submit_action(Action::new(ActionCategory::Maintenance, "delete_system_files"))
            .await
            .unwrap();
        assert!(report.denied());
        assert_eq!(report.action.status, ActionStatus::Failed);
        assert_eq!(agent_loop.metrics().actions_denied, 1);
        assert!(agent_loop.active_actions().is_empty());
    }

    #[tokio::test]
    async fn test_gate_disabled_skips_evaluation() {
        let mut config = quiet_config();
        config.autonomy.ethical_constraints = false;
        let (agent_loop, _) = test_loop(10, config);

        let report = agent_loop
            .submit_action(Action::new(ActionCategory::Social, "deceive_user"))
            .await
            .unwrap();
        assert!(report.evaluation.is_none());
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn test_unknown_executor_fails_action() {
        let (agent_loop, _) = test_loop(10, quiet_config());
        let report = agent_loop
            .submit_action(Action::new(ActionCategory::Learning, "read_article").with_executor("library"))
            .await
            .unwrap();
        assert_eq!(report.action.status, ActionStatus::Failed);
        assert_eq!(agent_loop.metrics().actions_failed, 1);
    }

    #[tokio::test]
    async fn test_reflection_interval() {
        let mut config = quiet_config();
        config.autonomy.reflection_interval_ticks = 2;
        let (agent_loop, clock) = test_loop(10, config);

        agent_loop.tick().await.unwrap();
        assert!(agent_loop.metrics().last_reflection.is_none());
        clock.advance_millis(1_000);
        agent_loop.tick().await.unwrap();
        assert_eq!(agent_loop.metrics().last_reflection.unwrap().ticks, 2);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let (agent_loop, _) = test_loop(10, quiet_config());
        assert!(agent_loop.stop().await.is_ok());
        assert!(!agent_loop.is_running());
    }
}
