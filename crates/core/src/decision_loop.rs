//! The per-tick driver System.
//!
//! One System call steps every enabled brain in the World: scores are
//! refreshed for all of a brain's actions, the best executable candidate is
//! selected under the busy/hysteresis interruption rule, lifecycle
//! transitions run, and the current action is ticked. Each brain's outcome
//! is forwarded as [`ActionSwitched`]/[`ActionFinished`] Messages.
//!
//! Intended to run on a fixed cadence (`FixedUpdate`), decoupled from the
//! render framerate; an action that needs multiple ticks simply stays
//! current across them. An action that never finishes and is never
//! displaced wedges its brain - the engine does not time it out.

use bevy::prelude::*;

use crate::blackboard::Blackboard;
use crate::brain::{BrainCtx, UtilityBrain};
use crate::debugger::ScoreDebugConfig;
use crate::events::{ActionFinished, ActionSwitched};
use crate::tags::TagContainer;

/// Step every enabled [`UtilityBrain`] once.
///
/// The clock handed to brains is `Time::elapsed()` - inside `FixedUpdate`
/// this is the fixed clock, so cooldown windows and execute/finish stamps
/// are monotonic and frame-rate independent.
pub fn utility_decision_tick(
    time: Res<Time>,
    debug_config: Option<Res<ScoreDebugConfig>>,
    mut brains: Query<(
        Entity,
        &mut UtilityBrain,
        Option<&TagContainer>,
        Option<&mut Blackboard>,
    )>,
    mut switch_writer: MessageWriter<ActionSwitched>,
    mut finish_writer: MessageWriter<ActionFinished>,
) {
    let always_compute_scores = debug_config
        .map(|config| config.always_compute_scores())
        .unwrap_or(false);

    let now = time.elapsed();
    let dt = time.delta_secs();

    for (entity, mut brain, tags, blackboard) in brains.iter_mut() {
        let mut ctx = BrainCtx::new(entity, now);
        ctx.tags = tags;
        ctx.blackboard = blackboard.map(|board| board.into_inner());
        ctx.always_compute_scores = always_compute_scores;

        let report = brain.step(&mut ctx, dt);

        if let Some(switch) = report.switched {
            #[cfg(feature = "logging")]
            bevy::log::debug!(
                "utility_decision_tick: {:?} - picked {:?} (score {:?}, was {:?})",
                entity,
                switch.next,
                switch.score,
                switch.previous,
            );

            switch_writer.write(ActionSwitched {
                entity,
                previous: switch.previous,
                next: switch.next,
                score: switch.score,
            });
        }

        for key in report.finished {
            finish_writer.write(ActionFinished { entity, key });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionBehavior, ActionConfig, ActionCtx, CustomScore, ScoreCtx};
    use crate::blackboard::BlackboardValue;

    use bevy::app::ScheduleRunnerPlugin;

    struct Hungry;

    impl ActionBehavior for Hungry {
        fn calculate_custom_score(&mut self, ctx: &ScoreCtx) -> CustomScore {
            CustomScore::Value(ctx.read_float("hunger"))
        }

        fn execute(&mut self, _ctx: &mut ActionCtx) {}

        fn tick(&mut self, ctx: &mut ActionCtx, _dt: f32) {
            if let Some(blackboard) = ctx.blackboard.as_deref_mut() {
                blackboard.set("hunger", BlackboardValue::Float(0.));
            }
            ctx.finish_action();
        }
    }

    struct Nap;

    impl ActionBehavior for Nap {
        fn calculate_custom_score(&mut self, ctx: &ScoreCtx) -> CustomScore {
            CustomScore::Value(ctx.read_float("fatigue"))
        }

        fn execute(&mut self, _ctx: &mut ActionCtx) {}
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_once()))
            .add_message::<ActionSwitched>()
            .add_message::<ActionFinished>()
            .add_systems(FixedUpdate, utility_decision_tick);
        // generous timestep so every update fires exactly one decision tick
        app.insert_resource(Time::<Fixed>::from_seconds(0.000001));
        app
    }

    #[test]
    fn test_tick_system_selects_and_finishes() {
        let mut app = test_app();

        let mut brain = UtilityBrain::new();
        brain
            .add_action(ActionConfig::new("eat"), Box::new(Hungry))
            .unwrap();
        brain
            .add_action(ActionConfig::new("sleep"), Box::new(Nap))
            .unwrap();

        let mut blackboard = Blackboard::new();
        blackboard.set("hunger", BlackboardValue::Float(0.9));
        blackboard.set("fatigue", BlackboardValue::Float(0.3));

        let agent = app.world_mut().spawn((brain, blackboard)).id();

        // several real updates so FixedUpdate gets a chance to run
        for _ in 0..5 {
            app.update();
        }

        let brain = app.world().get::<UtilityBrain>(agent).unwrap();
        // the eat action ran, zeroed its own hunger and finished; the nap
        // action won the rematch
        assert!(brain.action("eat").unwrap().execute_count() >= 1);
        assert_eq!(brain.current_key(), Some("sleep"));

        let blackboard = app.world().get::<Blackboard>(agent).unwrap();
        assert_eq!(blackboard.get_float("hunger"), 0.);
    }

    #[test]
    fn test_tag_gating_through_ecs() {
        let mut app = test_app();

        let mut brain = UtilityBrain::new();
        brain
            .add_action(
                ActionConfig::new("sleep")
                    .with_require_tags(["location.home"].into_iter().collect()),
                Box::new(Nap),
            )
            .unwrap();

        let mut blackboard = Blackboard::new();
        blackboard.set("fatigue", BlackboardValue::Float(0.8));

        let tags: TagContainer = ["location.wilds"].into_iter().collect();
        let agent = app.world_mut().spawn((brain, blackboard, tags)).id();

        for _ in 0..3 {
            app.update();
        }
        assert_eq!(
            app.world().get::<UtilityBrain>(agent).unwrap().current_key(),
            None
        );

        // once home, the nap gates in
        app.world_mut()
            .get_mut::<TagContainer>(agent)
            .unwrap()
            .add_tag("location.home");
        for _ in 0..3 {
            app.update();
        }
        assert_eq!(
            app.world().get::<UtilityBrain>(agent).unwrap().current_key(),
            Some("sleep")
        );
    }

    #[test]
    fn test_always_compute_scores_resource() {
        use crate::score::ScoreOperator;

        struct Breakdown;
        impl ActionBehavior for Breakdown {
            fn calculate_custom_score(&mut self, _ctx: &ScoreCtx) -> CustomScore {
                CustomScore::named(ScoreOperator::Multiply, &["near", "armed"], &[0.6, 0.5])
            }
        }

        let mut app = test_app();
        let mut config = ScoreDebugConfig::default();
        config.set_always_compute_scores(true);
        app.insert_resource(config);

        let mut brain = UtilityBrain::new();
        brain
            .add_action(
                ActionConfig::new("attack")
                    .with_require_tags(["state.alert"].into_iter().collect()),
                Box::new(Breakdown),
            )
            .unwrap();

        let agent = app.world_mut().spawn(brain).id();

        for _ in 0..3 {
            app.update();
        }

        let brain = app.world().get::<UtilityBrain>(agent).unwrap();
        let action = brain.action("attack").unwrap();
        // gated out: never picked, committed score untouched...
        assert_eq!(brain.current_key(), None);
        assert_eq!(action.score(), 0.);
        // ...but the inspection toggle still rebuilt the breakdown
        assert_eq!(action.scoring_elements().len(), 2);
    }
}
