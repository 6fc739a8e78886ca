//! Actions: per-kind behavior hooks, configuration, and the execution state machine.
//!
//! An [`ActionInstance`] pairs an immutable [`ActionConfig`] with a boxed
//! [`ActionBehavior`] - the per-kind override points - and owns the live
//! state the brain drives: the last committed score, its diagnostic
//! breakdown, and the Idle/Executing/Aborting lifecycle.

use std::time::Duration;

use bevy::prelude::*;

use crate::blackboard::Blackboard;
use crate::score::{self, ScoreElement, ScoreElements, ScoreOperator};
use crate::tags::{TagContainer, TagQuery, TagSet};
use crate::types::{self, ActionKey, Priority, Score};

/// Available methods to use for performing utility action scoring.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScoringMethod {
    /// Scoring via combining declarative data parameters. Reserved; always scores zero for now.
    Data,
    /// Scoring by calling the behavior's custom scoring function.
    #[default]
    Function,
}

/// The lifecycle of a single execution cycle.
///
/// `Aborting` is still 'executing' - the abort flag marks that the action has
/// been asked to wind down, not that it has stopped. Only `finish_action`
/// returns an action to `Idle`.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionPhase {
    #[default]
    Idle,
    Executing,
    Aborting,
}

impl ExecutionPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_executing(&self) -> bool {
        matches!(self, Self::Executing | Self::Aborting)
    }

    pub fn is_aborting(&self) -> bool {
        matches!(self, Self::Aborting)
    }
}

/// Immutable per-kind configuration for an action.
#[derive(Clone, Debug)]
pub struct ActionConfig {
    /// Human-readable display name; defaults to the key.
    pub name: String,
    /// The kind identifier. A brain holds at most one instance per key.
    pub key: ActionKey,
    /// Orders actions whose scores are within the equality tolerance.
    pub priority: Priority,
    /// Multiplier applied on top of the computed raw score.
    pub score_weight: Score,
    pub scoring_method: ScoringMethod,
    /// Tags this action owns; checked against challengers' interrupt tags.
    pub owned_tags: TagSet,
    /// All of these must be owned by the agent for the action to gate in.
    pub require_tags: TagSet,
    /// Owning any of these gates the action out.
    pub ignore_tags: TagSet,
    /// Arbitrary predicate over the agent's owned-tag snapshot.
    pub tag_query: TagQuery,
    /// Owning any of these lets this action pre-empt a busy agent.
    pub interrupt_tags: TagSet,
    /// Keep the committed score fixed while the action is executing.
    pub freeze_score_when_active: bool,
    /// Seconds after finishing before this action may execute again.
    pub cooldown: f32,
    /// Owning any of these gates the action out (re-checked every tick,
    /// unlike the time-based cooldown).
    pub cooldown_tags: TagSet,
}

impl ActionConfig {
    pub fn new<IS: Into<ActionKey>>(key: IS) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            priority: 0,
            score_weight: 1.,
            scoring_method: ScoringMethod::default(),
            owned_tags: TagSet::default(),
            require_tags: TagSet::default(),
            ignore_tags: TagSet::default(),
            tag_query: TagQuery::default(),
            interrupt_tags: TagSet::default(),
            freeze_score_when_active: false,
            cooldown: 0.,
            cooldown_tags: TagSet::default(),
        }
    }

    pub fn with_name<IS: Into<String>>(mut self, name: IS) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_score_weight(mut self, weight: Score) -> Self {
        self.score_weight = weight;
        self
    }

    pub fn with_scoring_method(mut self, method: ScoringMethod) -> Self {
        self.scoring_method = method;
        self
    }

    pub fn with_owned_tags(mut self, tags: TagSet) -> Self {
        self.owned_tags = tags;
        self
    }

    pub fn with_require_tags(mut self, tags: TagSet) -> Self {
        self.require_tags = tags;
        self
    }

    pub fn with_ignore_tags(mut self, tags: TagSet) -> Self {
        self.ignore_tags = tags;
        self
    }

    pub fn with_tag_query(mut self, query: TagQuery) -> Self {
        self.tag_query = query;
        self
    }

    pub fn with_interrupt_tags(mut self, tags: TagSet) -> Self {
        self.interrupt_tags = tags;
        self
    }

    pub fn with_frozen_score_when_active(mut self, freeze: bool) -> Self {
        self.freeze_score_when_active = freeze;
        self
    }

    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds.max(0.);
        self
    }

    pub fn with_cooldown_tags(mut self, tags: TagSet) -> Self {
        self.cooldown_tags = tags;
        self
    }
}

/// The result of a custom score calculation.
///
/// The richer form carries named sub-scores plus the operator to reduce them
/// with; these get recorded into the instance's [`ScoreElements`] for
/// inspection before being combined.
#[derive(Clone, Debug)]
pub enum CustomScore {
    Value(Score),
    Elements {
        operator: ScoreOperator,
        elements: Vec<ScoreElement>,
    },
}

impl CustomScore {
    /// Build an elements score from parallel name/value arrays.
    ///
    /// The arrays must be the same length; in release builds a mismatch
    /// degrades to pairing what lines up and skipping the rest.
    pub fn named(operator: ScoreOperator, names: &[&str], values: &[Score]) -> Self {
        debug_assert_eq!(
            names.len(),
            values.len(),
            "CustomScore::named: names and values must have the same length"
        );

        Self::Elements {
            operator,
            elements: names
                .iter()
                .zip(values.iter())
                .map(|(name, value)| ScoreElement::new(*name, *value))
                .collect(),
        }
    }
}

impl From<Score> for CustomScore {
    fn from(value: Score) -> Self {
        Self::Value(value)
    }
}

/// Read-only context handed to scoring hooks.
pub struct ScoreCtx<'w> {
    pub entity: Entity,
    /// Monotonic clock sample for this tick.
    pub now: Duration,
    pub tags: Option<&'w TagContainer>,
    pub blackboard: Option<&'w Blackboard>,
}

impl ScoreCtx<'_> {
    /// Convenience accessor; reads zero when no blackboard is attached.
    pub fn read_float(&self, key: &str) -> Score {
        self.blackboard
            .map(|blackboard| blackboard.get_float(key))
            .unwrap_or(0.)
    }

    pub fn read_bool(&self, key: &str) -> bool {
        self.blackboard
            .map(|blackboard| blackboard.get_bool(key))
            .unwrap_or(false)
    }
}

/// Mutable context handed to lifecycle hooks (execute/abort/tick/on_finished).
///
/// Completion is signalled synchronously: a hook calls [`ActionCtx::finish_action`]
/// and the engine drains the request right after the hook returns. There is no
/// broadcast to unsubscribe from and no re-entrant mutation of the action list.
pub struct ActionCtx<'w> {
    pub entity: Entity,
    /// Monotonic clock sample for this tick.
    pub now: Duration,
    pub tags: Option<&'w TagContainer>,
    pub blackboard: Option<&'w mut Blackboard>,
    finish_requested: bool,
    freeze_request: Option<bool>,
}

impl<'w> ActionCtx<'w> {
    pub fn new(
        entity: Entity,
        now: Duration,
        tags: Option<&'w TagContainer>,
        blackboard: Option<&'w mut Blackboard>,
    ) -> Self {
        Self {
            entity,
            now,
            tags,
            blackboard,
            finish_requested: false,
            freeze_request: None,
        }
    }

    /// Request that the action be finished once the current hook returns.
    pub fn finish_action(&mut self) {
        self.finish_requested = true;
    }

    /// Explicitly freeze or unfreeze the committed score, independent of the
    /// `freeze_score_when_active` configuration.
    pub fn set_score_frozen(&mut self, frozen: bool) {
        self.freeze_request = Some(frozen);
    }
}

/// Per-kind override points for an action.
///
/// Every method has a default body; a minimal action only implements
/// `calculate_custom_score` and `execute`. The default `execute`/`abort`
/// finish immediately, so an unimplemented action never wedges its brain.
pub trait ActionBehavior: Send + Sync + 'static {
    /// Called exactly once, right after the instance is added to a brain.
    fn initialize(&mut self) {}

    /// Called exactly once, before the instance is destroyed.
    fn deinitialize(&mut self) {}

    /// Whether the score may be recomputed this tick. `frozen` reflects the
    /// instance's frozen flag; the default honors it, keeping the last
    /// committed score. Override to `true` to always recompute.
    fn can_calculate_score(&self, frozen: bool) -> bool {
        !frozen
    }

    /// Perform a custom calculation to determine the current score of this action.
    fn calculate_custom_score(&mut self, _ctx: &ScoreCtx) -> CustomScore {
        CustomScore::Value(types::MIN_SCORE)
    }

    /// Execute the action. Must (eventually) lead to `ctx.finish_action()`.
    fn execute(&mut self, ctx: &mut ActionCtx) {
        ctx.finish_action();
    }

    /// Abort the action. Must (eventually) lead to `ctx.finish_action()`.
    fn abort(&mut self, ctx: &mut ActionCtx) {
        ctx.finish_action();
    }

    /// Ticked every brain step while this action is current (or still aborting).
    fn tick(&mut self, _ctx: &mut ActionCtx, _dt: f32) {}

    /// Called when the action has finished, after the phase reset.
    fn on_finished(&mut self, _ctx: &mut ActionCtx) {}

    /// Report 'do not interrupt me' independently of the agent-wide busy tags.
    fn is_busy(&self) -> bool {
        false
    }
}

/// A live action: configuration, behavior, and lifecycle state, owned by
/// exactly one brain.
pub struct ActionInstance {
    config: ActionConfig,
    behavior: Box<dyn ActionBehavior>,
    score: Score,
    scoring_elements: ScoreElements,
    explicitly_frozen: bool,
    phase: ExecutionPhase,
    execute_count: u32,
    last_execute_time: Option<Duration>,
    last_finish_time: Option<Duration>,
    initialized: bool,
}

impl ActionInstance {
    pub fn new(config: ActionConfig, behavior: Box<dyn ActionBehavior>) -> Self {
        Self {
            config,
            behavior,
            score: types::MIN_SCORE,
            scoring_elements: ScoreElements::default(),
            explicitly_frozen: false,
            phase: ExecutionPhase::Idle,
            execute_count: 0,
            last_execute_time: None,
            last_finish_time: None,
            initialized: false,
        }
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn priority(&self) -> Priority {
        self.config.priority
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn scoring_elements(&self) -> &ScoreElements {
        &self.scoring_elements
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn is_executing(&self) -> bool {
        self.phase.is_executing()
    }

    pub fn is_aborting(&self) -> bool {
        self.phase.is_aborting()
    }

    pub fn execute_count(&self) -> u32 {
        self.execute_count
    }

    pub fn last_execute_time(&self) -> Option<Duration> {
        self.last_execute_time
    }

    pub fn last_finish_time(&self) -> Option<Duration> {
        self.last_finish_time
    }

    pub fn is_busy(&self) -> bool {
        self.behavior.is_busy()
    }

    pub fn is_score_frozen(&self) -> bool {
        (self.config.freeze_score_when_active && self.phase.is_executing())
            || self.explicitly_frozen
    }

    /// Mutable access to the behavior, e.g. to feed it external completion
    /// signals between ticks.
    pub fn behavior_mut(&mut self) -> &mut dyn ActionBehavior {
        self.behavior.as_mut()
    }

    pub(crate) fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        #[cfg(feature = "logging")]
        bevy::log::debug!("ActionInstance: Initialize: {:?}", self.config.name);

        self.initialized = true;
        self.behavior.initialize();
    }

    pub(crate) fn deinitialize(&mut self) {
        if !self.initialized {
            return;
        }

        #[cfg(feature = "logging")]
        bevy::log::debug!("ActionInstance: Deinitialize: {:?}", self.config.name);

        self.initialized = false;
        self.behavior.deinitialize();
    }

    /// The tag-based gating predicate.
    ///
    /// The fast path skips straight to `true` when no requirements are
    /// configured; cooldown tags are deliberately not part of that check.
    /// With requirements present but no [`TagContainer`] available, gating
    /// fails closed.
    pub fn tag_requirements_met(&self, tags: Option<&TagContainer>) -> bool {
        if self.config.require_tags.is_empty()
            && self.config.ignore_tags.is_empty()
            && self.config.tag_query.is_empty()
        {
            // early out
            return true;
        }

        let Some(tags) = tags else {
            return false;
        };

        if !tags.has_all(&self.config.require_tags) {
            return false;
        }

        if tags.has_any(&self.config.ignore_tags) {
            return false;
        }

        if tags.has_any(&self.config.cooldown_tags) {
            return false;
        }

        if !self.config.tag_query.is_empty() && !self.config.tag_query.matches(tags.owned_tags()) {
            return false;
        }

        true
    }

    /// True while the time-based cooldown from the last finish is still running.
    pub fn in_cooldown(&self, now: Duration) -> bool {
        if self.config.cooldown <= 0. {
            return false;
        }

        match self.last_finish_time {
            None => false,
            Some(finished_at) => {
                now.saturating_sub(finished_at) < Duration::from_secs_f32(self.config.cooldown)
            }
        }
    }

    /// Whether this action is a valid selection candidate right now.
    pub fn can_execute(&self, tags: Option<&TagContainer>, now: Duration) -> bool {
        self.tag_requirements_met(tags)
            && self.score > types::EXECUTABLE_SCORE_EPSILON
            && !self.in_cooldown(now)
    }

    /// Recompute and commit the score, if the action is allowed to.
    ///
    /// With `always_compute` set (the inspection toggle), a gated-out or
    /// frozen action still rebuilds its scoring elements so the breakdown can
    /// be rendered - but the committed score is left untouched.
    pub fn update_score(&mut self, ctx: &ScoreCtx, always_compute: bool) {
        let may_commit = self.tag_requirements_met(ctx.tags)
            && self.behavior.can_calculate_score(self.is_score_frozen());

        if may_commit {
            self.scoring_elements.clear();
            let new_score = self.calculate_score(ctx);
            self.score = new_score;
        } else if always_compute {
            // diagnostics only; the committed score must not move
            self.scoring_elements.clear();
            let _ = self.calculate_score(ctx);
        }
    }

    fn calculate_score(&mut self, ctx: &ScoreCtx) -> Score {
        let calculated = match self.config.scoring_method {
            ScoringMethod::Data => types::MIN_SCORE,
            ScoringMethod::Function => match self.behavior.calculate_custom_score(ctx) {
                CustomScore::Value(value) => value,
                CustomScore::Elements { operator, elements } => {
                    self.scoring_elements.set_operator(operator);
                    let values: Vec<Score> =
                        elements.iter().map(|element| element.value).collect();
                    for element in elements {
                        self.scoring_elements.record(element);
                    }
                    score::combine_scores(&values, operator)
                }
            },
        };

        calculated * self.config.score_weight
    }

    /// Begin executing. Returns true if the action finished synchronously.
    pub fn start_execute(&mut self, ctx: &mut ActionCtx) -> bool {
        #[cfg(feature = "logging")]
        bevy::log::debug!("ActionInstance: Execute: {:?}", self.config.name);

        self.phase = ExecutionPhase::Executing;
        self.execute_count += 1;
        self.last_execute_time = Some(ctx.now);

        self.behavior.execute(ctx);
        self.drain_requests(ctx)
    }

    /// Begin aborting. Returns true if the action finished synchronously.
    pub fn start_abort(&mut self, ctx: &mut ActionCtx) -> bool {
        if !self.phase.is_executing() {
            return false;
        }

        #[cfg(feature = "logging")]
        bevy::log::debug!("ActionInstance: Abort: {:?}", self.config.name);

        self.phase = ExecutionPhase::Aborting;
        self.behavior.abort(ctx);
        self.drain_requests(ctx)
    }

    /// Tick in-progress work. Returns true if the action finished this tick.
    pub fn tick(&mut self, ctx: &mut ActionCtx, dt: f32) -> bool {
        self.behavior.tick(ctx, dt);
        self.drain_requests(ctx)
    }

    /// Finish the current execution cycle and return to `Idle`.
    pub fn finish_action(&mut self, ctx: &mut ActionCtx) {
        #[cfg(feature = "logging")]
        bevy::log::debug!("ActionInstance: Finished: {:?}", self.config.name);

        self.phase = ExecutionPhase::Idle;
        self.last_finish_time = Some(ctx.now);

        self.behavior.on_finished(ctx);
        // an on_finished hook re-requesting completion is meaningless
        ctx.finish_requested = false;
        if let Some(frozen) = ctx.freeze_request.take() {
            self.explicitly_frozen = frozen;
        }
    }

    /// Apply any requests a hook left on the context. Returns true if the
    /// action finished as a result.
    fn drain_requests(&mut self, ctx: &mut ActionCtx) -> bool {
        if let Some(frozen) = ctx.freeze_request.take() {
            self.explicitly_frozen = frozen;
        }

        if std::mem::take(&mut ctx.finish_requested) {
            self.finish_action(ctx);
            true
        } else {
            false
        }
    }
}

impl std::fmt::Debug for ActionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionInstance")
            .field("key", &self.config.key)
            .field("score", &self.score)
            .field("phase", &self.phase)
            .field("execute_count", &self.execute_count)
            .finish()
    }
}
