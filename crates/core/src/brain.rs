//! The per-agent owner of actions: scoring, selection, and lifecycle driving.

use std::time::Duration;

use bevy::prelude::*;

use crate::action::{ActionBehavior, ActionConfig, ActionCtx, ActionInstance, ScoreCtx};
use crate::blackboard::Blackboard;
use crate::errors::SpawnRefusal;
use crate::score::nearly_equal;
use crate::tags::{TagContainer, TagSet};
use crate::types::{self, ActionKey, Score};

/// The borrows one brain step works against, gathered off the agent Entity.
///
/// Everything is optional except identity and the clock - a brain on a bare
/// Entity still selects and executes, it just gates tag-constrained actions
/// out and hands its hooks an empty context.
pub struct BrainCtx<'w> {
    pub entity: Entity,
    /// Monotonic clock sample for this tick.
    pub now: Duration,
    pub tags: Option<&'w TagContainer>,
    pub blackboard: Option<&'w mut Blackboard>,
    /// Inspection toggle: rebuild scoring elements even for actions whose
    /// score gate fails. Never changes a committed score.
    pub always_compute_scores: bool,
}

impl<'w> BrainCtx<'w> {
    pub fn new(entity: Entity, now: Duration) -> Self {
        Self {
            entity,
            now,
            tags: None,
            blackboard: None,
            always_compute_scores: false,
        }
    }

    fn score_ctx(&self) -> ScoreCtx<'_> {
        ScoreCtx {
            entity: self.entity,
            now: self.now,
            tags: self.tags,
            blackboard: self.blackboard.as_deref(),
        }
    }

    fn hook_ctx(&mut self) -> ActionCtx<'_> {
        ActionCtx::new(self.entity, self.now, self.tags, self.blackboard.as_deref_mut())
    }
}

/// A switch performed during one brain step.
#[derive(Debug, Clone)]
pub struct ActionSwitch {
    pub previous: Option<ActionKey>,
    pub next: ActionKey,
    pub score: Score,
}

/// What happened during one brain step; the decision-loop system forwards
/// this as messages.
#[derive(Debug, Default)]
pub struct StepReport {
    pub switched: Option<ActionSwitch>,
    pub finished: Vec<ActionKey>,
}

/// The central Component that performs action scoring and selection.
/// Intended to be added to an agent Entity.
///
/// Holds the live [`ActionInstance`] collection (insertion order is
/// significant: it is the final selection tie-break) and a weak
/// back-reference to the currently running action by index - never an
/// ownership edge, and cleared whenever the referenced entry is removed.
#[derive(Component)]
pub struct UtilityBrain {
    actions: Vec<ActionInstance>,
    current: Option<usize>,
    /// Owning any of these marks the whole agent busy; a busy agent only
    /// switches actions via interrupt tags.
    pub busy_tags: TagSet,
    /// Minimum score margin a challenger must exceed over the executing
    /// action to trigger a switch.
    pub score_hysteresis_threshold: Score,
    /// Disabled brains skip their step entirely.
    pub enabled: bool,
}

impl Default for UtilityBrain {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            current: None,
            busy_tags: TagSet::default(),
            score_hysteresis_threshold: types::DEFAULT_SCORE_HYSTERESIS,
            enabled: true,
        }
    }
}

impl UtilityBrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy_tags(mut self, tags: TagSet) -> Self {
        self.busy_tags = tags;
        self
    }

    pub fn with_score_hysteresis_threshold(mut self, threshold: Score) -> Self {
        self.score_hysteresis_threshold = threshold;
        self
    }

    /// Add a new action instance. Inserting a kind the brain already holds
    /// is refused and leaves the existing instance untouched.
    pub fn add_action(
        &mut self,
        config: ActionConfig,
        behavior: Box<dyn ActionBehavior>,
    ) -> Result<(), SpawnRefusal> {
        if self.has_action(&config.key) {
            // action already instanced
            return Err(SpawnRefusal::DuplicateKind(config.key));
        }

        let mut instance = ActionInstance::new(config, behavior);
        instance.initialize();
        self.actions.push(instance);
        Ok(())
    }

    /// Remove an action by kind, deinitializing it. Repairs the current-action
    /// back-reference so it can never dangle.
    pub fn remove_action(&mut self, key: &str) -> bool {
        let Some(index) = self.actions.iter().position(|action| action.key() == key) else {
            return false;
        };

        let mut removed = self.actions.remove(index);
        removed.deinitialize();

        self.current = match self.current {
            Some(current) if current == index => None,
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        true
    }

    pub fn has_action(&self, key: &str) -> bool {
        self.actions.iter().any(|action| action.key() == key)
    }

    pub fn action(&self, key: &str) -> Option<&ActionInstance> {
        self.actions.iter().find(|action| action.key() == key)
    }

    pub fn action_mut(&mut self, key: &str) -> Option<&mut ActionInstance> {
        self.actions.iter_mut().find(|action| action.key() == key)
    }

    pub fn actions(&self) -> &[ActionInstance] {
        &self.actions
    }

    pub fn current_action(&self) -> Option<&ActionInstance> {
        self.current.map(|index| &self.actions[index])
    }

    pub fn current_key(&self) -> Option<&str> {
        self.current_action().map(|action| action.key())
    }

    /// Agent-wide busy check: busy tags owned by the agent, or the current
    /// action reporting itself busy.
    pub fn is_busy(&self, tags: Option<&TagContainer>) -> bool {
        if let Some(tags) = tags {
            if !self.busy_tags.is_empty() && tags.has_any(&self.busy_tags) {
                return true;
            }
        }
        self.current_action()
            .map(|action| action.is_busy())
            .unwrap_or(false)
    }

    /// Find the best executable candidate.
    ///
    /// Comparator: strictly higher score wins; scores within the equality
    /// tolerance fall back to strictly higher priority; remaining ties keep
    /// the earliest candidate in insertion order.
    pub fn select_best(&self, tags: Option<&TagContainer>, now: Duration) -> Option<usize> {
        let mut best: Option<usize> = None;

        for (index, candidate) in self.actions.iter().enumerate() {
            if !candidate.can_execute(tags, now) {
                continue;
            }

            let Some(best_index) = best else {
                best = Some(index);
                continue;
            };

            let incumbent = &self.actions[best_index];
            if nearly_equal(candidate.score(), incumbent.score()) {
                if candidate.priority() > incumbent.priority() {
                    best = Some(index);
                }
            } else if candidate.score() > incumbent.score() {
                best = Some(index);
            }
        }

        best
    }

    /// The busy part of the interruption rule: when busy, a new action may
    /// only start if the current action's owned tags intersect the
    /// candidate's interrupt tags. A busy agent with no current action
    /// cannot start anything at all.
    fn can_activate(&self, best_index: usize, tags: Option<&TagContainer>) -> bool {
        if !self.is_busy(tags) {
            return true;
        }

        match self.current {
            None => false,
            Some(current) => self.actions[current]
                .config()
                .owned_tags
                .has_any(&self.actions[best_index].config().interrupt_tags),
        }
    }

    /// The hysteresis part of the interruption rule: a challenger must beat
    /// the current action's score by the threshold while it is executing.
    fn clears_hysteresis(&self, best_index: usize) -> bool {
        match self.current {
            None => true,
            Some(current) => {
                let incumbent = &self.actions[current];
                let margin = if incumbent.is_executing() {
                    self.score_hysteresis_threshold
                } else {
                    0.
                };
                self.actions[best_index].score() > incumbent.score() + margin
            }
        }
    }

    /// Run one full decision tick: refresh scores, select, maybe switch,
    /// tick the current action, then drain any still-aborting actions.
    ///
    /// Within a step, score updates for all actions happen before selection,
    /// selection before lifecycle transitions, transitions before tick calls.
    pub fn step(&mut self, ctx: &mut BrainCtx, dt: f32) -> StepReport {
        let mut report = StepReport::default();

        if !self.enabled {
            return report;
        }

        // 1. refresh every action's score
        {
            let score_ctx = ctx.score_ctx();
            for action in self.actions.iter_mut() {
                action.update_score(&score_ctx, ctx.always_compute_scores);
            }
        }

        // 2. pick the challenger
        let best = self.select_best(ctx.tags, ctx.now);

        // 3. switch if the interruption rule allows it
        if let Some(best_index) = best {
            if Some(best_index) != self.current
                && self.can_activate(best_index, ctx.tags)
                && self.clears_hysteresis(best_index)
            {
                let previous = self.current;
                let previous_key = previous.map(|index| self.actions[index].key().to_owned());

                if let Some(current) = previous {
                    let incumbent = &mut self.actions[current];
                    if incumbent.is_executing() {
                        // Once displaced, the old action's completion no longer
                        // clears the current slot; it winds down on its own.
                        let mut hook_ctx = ctx.hook_ctx();
                        if incumbent.start_abort(&mut hook_ctx) {
                            report.finished.push(incumbent.key().to_owned());
                        }
                    }
                }

                self.current = Some(best_index);

                let next = &mut self.actions[best_index];
                let switch = ActionSwitch {
                    previous: previous_key,
                    next: next.key().to_owned(),
                    score: next.score(),
                };

                #[cfg(feature = "logging")]
                bevy::log::debug!(
                    "UtilityBrain: {:?} - switching from {:?} to {:?} (score {:?})",
                    ctx.entity,
                    switch.previous,
                    switch.next,
                    switch.score,
                );

                let mut hook_ctx = ctx.hook_ctx();
                if next.start_execute(&mut hook_ctx) {
                    report.finished.push(next.key().to_owned());
                    // finished synchronously; reselect next tick
                    self.current = None;
                }

                report.switched = Some(switch);
            }
        }

        // 4. tick the current action
        if let Some(current) = self.current {
            let action = &mut self.actions[current];
            let mut hook_ctx = ctx.hook_ctx();
            if action.tick(&mut hook_ctx, dt) {
                report.finished.push(action.key().to_owned());
                self.current = None;
            }
        }

        // 5. drain pending aborts
        for index in 0..self.actions.len() {
            if Some(index) == self.current || !self.actions[index].is_aborting() {
                continue;
            }

            let mut hook_ctx = ctx.hook_ctx();
            if self.actions[index].tick(&mut hook_ctx, dt) {
                report.finished.push(self.actions[index].key().to_owned());
            }
        }

        report
    }

    fn deinitialize_actions(&mut self) {
        for action in self.actions.iter_mut() {
            action.deinitialize();
        }
        self.current = None;
    }
}

impl Drop for UtilityBrain {
    fn drop(&mut self) {
        self.deinitialize_actions();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionBehavior, ActionCtx, CustomScore, ScoreCtx};
    use crate::blackboard::{Blackboard, BlackboardValue};

    /// Reads its score from the blackboard under its own key and keeps
    /// executing until aborted or outscored.
    struct KeyedScore {
        key: &'static str,
    }

    impl ActionBehavior for KeyedScore {
        fn calculate_custom_score(&mut self, ctx: &ScoreCtx) -> CustomScore {
            CustomScore::Value(ctx.read_float(self.key))
        }

        fn execute(&mut self, _ctx: &mut ActionCtx) {}
    }

    fn keyed_action(brain: &mut UtilityBrain, key: &'static str) {
        keyed_action_with(brain, key, |config| config);
    }

    fn keyed_action_with<F: FnOnce(ActionConfig) -> ActionConfig>(
        brain: &mut UtilityBrain,
        key: &'static str,
        configure: F,
    ) {
        brain
            .add_action(configure(ActionConfig::new(key)), Box::new(KeyedScore { key }))
            .expect("unique test action kind");
    }

    fn step_with_scores(
        brain: &mut UtilityBrain,
        blackboard: &mut Blackboard,
        scores: &[(&'static str, Score)],
        now_secs: u64,
    ) -> StepReport {
        for (key, score) in scores {
            blackboard.set(*key, BlackboardValue::Float(*score));
        }
        let mut ctx = BrainCtx::new(Entity::PLACEHOLDER, Duration::from_secs(now_secs));
        ctx.blackboard = Some(blackboard);
        brain.step(&mut ctx, 0.025)
    }

    #[test]
    fn test_selects_highest_score() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "eat");
        keyed_action(&mut brain, "sleep");

        let mut blackboard = Blackboard::new();
        let report = step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("eat", 0.3), ("sleep", 0.8)],
            1,
        );

        assert_eq!(brain.current_key(), Some("sleep"));
        let switch = report.switched.expect("first step switches");
        assert_eq!(switch.next, "sleep");
        assert_eq!(switch.previous, None);
    }

    #[test]
    fn test_selection_determinism() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "a");
        keyed_action(&mut brain, "b");
        keyed_action(&mut brain, "c");

        let mut blackboard = Blackboard::new();
        step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("a", 0.2), ("b", 0.9), ("c", 0.5)],
            1,
        );

        let first = brain.select_best(None, Duration::from_secs(1));
        for _ in 0..10 {
            assert_eq!(brain.select_best(None, Duration::from_secs(1)), first);
        }
    }

    #[test]
    fn test_gated_out_actions_never_selected() {
        let mut brain = UtilityBrain::new();
        keyed_action_with(&mut brain, "locked", |config| {
            config.with_require_tags(["permission.never"].into_iter().collect())
        });
        keyed_action(&mut brain, "free");

        let mut blackboard = Blackboard::new();
        step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("locked", 1.0), ("free", 0.1)],
            1,
        );

        // the locked action outscores, but cannot execute
        assert_eq!(brain.current_key(), Some("free"));
    }

    #[test]
    fn test_no_candidates_leaves_current_empty() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "idle");

        let mut blackboard = Blackboard::new();
        step_with_scores(&mut brain, &mut blackboard, &[("idle", 0.)], 1);

        assert_eq!(brain.current_key(), None);
    }

    #[test]
    fn test_hysteresis_damps_close_challengers() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "a");
        keyed_action(&mut brain, "b");

        let mut blackboard = Blackboard::new();
        step_with_scores(&mut brain, &mut blackboard, &[("a", 0.4), ("b", 0.1)], 1);
        assert_eq!(brain.current_key(), Some("a"));

        // within the 0.02 threshold: no switch
        step_with_scores(&mut brain, &mut blackboard, &[("a", 0.4), ("b", 0.41)], 2);
        assert_eq!(brain.current_key(), Some("a"));

        // clears the threshold: switch
        let report =
            step_with_scores(&mut brain, &mut blackboard, &[("a", 0.4), ("b", 0.43)], 3);
        assert_eq!(brain.current_key(), Some("b"));
        let switch = report.switched.expect("threshold cleared");
        assert_eq!(switch.previous.as_deref(), Some("a"));
    }

    #[test]
    fn test_priority_breaks_near_equal_scores() {
        let mut brain = UtilityBrain::new();
        keyed_action_with(&mut brain, "low", |config| config.with_priority(1));
        keyed_action_with(&mut brain, "high", |config| config.with_priority(2));

        let mut blackboard = Blackboard::new();
        step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("low", 0.40002), ("high", 0.40001)],
            1,
        );

        assert_eq!(brain.current_key(), Some("high"));
    }

    #[test]
    fn test_insertion_order_breaks_full_ties() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "first");
        keyed_action(&mut brain, "second");

        let mut blackboard = Blackboard::new();
        step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("first", 0.5), ("second", 0.5)],
            1,
        );

        assert_eq!(brain.current_key(), Some("first"));
    }

    #[test]
    fn test_busy_tags_block_switching() {
        let mut brain =
            UtilityBrain::new().with_busy_tags(["state.busy"].into_iter().collect());
        keyed_action(&mut brain, "patrol");
        keyed_action_with(&mut brain, "alarm", |config| {
            config.with_interrupt_tags(["activity.routine"].into_iter().collect())
        });

        let tags: TagContainer = ["state.busy"].into_iter().collect();

        // busy with no current action: nothing may start
        let mut blackboard = Blackboard::new();
        blackboard.set("patrol", BlackboardValue::Float(0.5));
        let mut ctx = BrainCtx::new(Entity::PLACEHOLDER, Duration::from_secs(1));
        ctx.tags = Some(&tags);
        ctx.blackboard = Some(&mut blackboard);
        brain.step(&mut ctx, 0.025);
        assert_eq!(brain.current_key(), None);
    }

    #[test]
    fn test_interrupt_tags_override_busy() {
        let mut brain =
            UtilityBrain::new().with_busy_tags(["state.busy"].into_iter().collect());
        keyed_action_with(&mut brain, "ritual", |config| {
            config.with_owned_tags(["activity.ritual"].into_iter().collect())
        });
        keyed_action_with(&mut brain, "flee", |config| {
            config.with_interrupt_tags(["activity.ritual"].into_iter().collect())
        });
        keyed_action(&mut brain, "chat");

        // start the ritual while not busy
        let mut blackboard = Blackboard::new();
        step_with_scores(&mut brain, &mut blackboard, &[("ritual", 0.5)], 1);
        assert_eq!(brain.current_key(), Some("ritual"));

        // now busy: a plain challenger cannot displace it
        let tags: TagContainer = ["state.busy"].into_iter().collect();
        blackboard.set("chat", BlackboardValue::Float(0.9));
        let mut ctx = BrainCtx::new(Entity::PLACEHOLDER, Duration::from_secs(2));
        ctx.tags = Some(&tags);
        ctx.blackboard = Some(&mut blackboard);
        brain.step(&mut ctx, 0.025);
        assert_eq!(brain.current_key(), Some("ritual"));

        // but an interrupter with matching tags can
        blackboard.set("flee", BlackboardValue::Float(0.95));
        let mut ctx = BrainCtx::new(Entity::PLACEHOLDER, Duration::from_secs(3));
        ctx.tags = Some(&tags);
        ctx.blackboard = Some(&mut blackboard);
        brain.step(&mut ctx, 0.025);
        assert_eq!(brain.current_key(), Some("flee"));
    }

    #[test]
    fn test_single_active_invariant() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "a");
        keyed_action(&mut brain, "b");
        keyed_action(&mut brain, "c");

        let mut blackboard = Blackboard::new();
        let score_sets: &[&[(&'static str, Score)]] = &[
            &[("a", 0.9), ("b", 0.1), ("c", 0.1)],
            &[("a", 0.1), ("b", 0.9), ("c", 0.1)],
            &[("a", 0.1), ("b", 0.1), ("c", 0.9)],
            &[("a", 0.9), ("b", 0.9), ("c", 0.9)],
        ];

        for (tick, scores) in score_sets.iter().cycle().take(12).enumerate() {
            step_with_scores(&mut brain, &mut blackboard, scores, tick as u64 + 1);

            let executing = brain
                .actions()
                .iter()
                .filter(|action| {
                    action.phase() == crate::action::ExecutionPhase::Executing
                })
                .count();
            assert!(executing <= 1, "tick {tick}: {executing} actions executing");
        }
    }

    #[test]
    fn test_displaced_action_drains_through_abort() {
        struct SlowAbort;
        impl ActionBehavior for SlowAbort {
            fn calculate_custom_score(&mut self, ctx: &ScoreCtx) -> CustomScore {
                CustomScore::Value(ctx.read_float("slow"))
            }
            fn execute(&mut self, _ctx: &mut ActionCtx) {}
            fn abort(&mut self, _ctx: &mut ActionCtx) {}
            fn tick(&mut self, ctx: &mut ActionCtx, _dt: f32) {
                if ctx.now >= Duration::from_secs(3) {
                    ctx.finish_action();
                }
            }
        }

        let mut brain = UtilityBrain::new();
        brain
            .add_action(ActionConfig::new("slow"), Box::new(SlowAbort))
            .unwrap();
        keyed_action(&mut brain, "fast");

        let mut blackboard = Blackboard::new();
        step_with_scores(&mut brain, &mut blackboard, &[("slow", 0.5)], 1);
        assert_eq!(brain.current_key(), Some("slow"));

        // displaced; the slow action starts aborting but doesn't finish yet
        step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("slow", 0.5), ("fast", 0.9)],
            2,
        );
        assert_eq!(brain.current_key(), Some("fast"));
        assert!(brain.action("slow").unwrap().is_aborting());

        // the drain keeps ticking it until it finishes
        let report = step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("slow", 0.5), ("fast", 0.9)],
            3,
        );
        assert!(!brain.action("slow").unwrap().is_executing());
        assert!(report.finished.contains(&"slow".to_string()));
    }

    #[test]
    fn test_duplicate_kind_is_refused() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "eat");

        let refusal = brain.add_action(
            ActionConfig::new("eat"),
            Box::new(KeyedScore { key: "eat" }),
        );
        assert!(matches!(refusal, Err(SpawnRefusal::DuplicateKind(_))));
        assert_eq!(brain.actions().len(), 1);
    }

    #[test]
    fn test_remove_action_repairs_current_index() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "a");
        keyed_action(&mut brain, "b");
        keyed_action(&mut brain, "c");

        let mut blackboard = Blackboard::new();
        step_with_scores(
            &mut brain,
            &mut blackboard,
            &[("a", 0.1), ("b", 0.1), ("c", 0.9)],
            1,
        );
        assert_eq!(brain.current_key(), Some("c"));

        // removing an earlier entry shifts the back-reference
        assert!(brain.remove_action("a"));
        assert_eq!(brain.current_key(), Some("c"));

        // removing the current entry clears it
        assert!(brain.remove_action("c"));
        assert_eq!(brain.current_key(), None);

        assert!(!brain.remove_action("a"));
    }

    #[test]
    fn test_finished_action_reexecutes_later() {
        struct OneShot;
        impl ActionBehavior for OneShot {
            fn calculate_custom_score(&mut self, ctx: &ScoreCtx) -> CustomScore {
                CustomScore::Value(ctx.read_float("shot"))
            }
        }

        let mut brain = UtilityBrain::new();
        brain
            .add_action(ActionConfig::new("shot"), Box::new(OneShot))
            .unwrap();

        let mut blackboard = Blackboard::new();
        let report = step_with_scores(&mut brain, &mut blackboard, &[("shot", 0.5)], 1);
        // synchronous finish: slot cleared within the same tick
        assert_eq!(brain.current_key(), None);
        assert!(report.finished.contains(&"shot".to_string()));
        assert_eq!(brain.action("shot").unwrap().execute_count(), 1);

        step_with_scores(&mut brain, &mut blackboard, &[("shot", 0.5)], 2);
        assert_eq!(brain.action("shot").unwrap().execute_count(), 2);
    }

    #[test]
    fn test_disabled_brain_does_nothing() {
        let mut brain = UtilityBrain::new();
        keyed_action(&mut brain, "a");
        brain.enabled = false;

        let mut blackboard = Blackboard::new();
        step_with_scores(&mut brain, &mut blackboard, &[("a", 0.9)], 1);
        assert_eq!(brain.current_key(), None);
        assert_eq!(brain.action("a").unwrap().score(), 0.);
    }
}
