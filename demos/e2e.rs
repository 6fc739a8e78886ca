//! End-to-end demo: a forager that idles, eats when hungry, and drops
//! everything to flee when a threat shows up.
//!
//! Run with `cargo run --example e2e`. The demo prints every action switch
//! and a periodic score table, then exits on its own after ~10 seconds.

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;

use volition::prelude::*;
use volition_bevy_plugin::VolitionPlugin;

struct Loiter;

impl ActionBehavior for Loiter {
    fn calculate_custom_score(&mut self, _ctx: &ScoreCtx) -> CustomScore {
        // a weak constant fallback so the forager never stands truly still
        CustomScore::Value(0.05)
    }

    fn execute(&mut self, _ctx: &mut ActionCtx) {}
}

struct Eat;

impl ActionBehavior for Eat {
    fn calculate_custom_score(&mut self, ctx: &ScoreCtx) -> CustomScore {
        let food = if ctx.read_bool("food_nearby") { 1. } else { 0. };
        CustomScore::named(
            ScoreOperator::Multiply,
            &["hunger", "food_nearby"],
            &[ctx.read_float("hunger"), food],
        )
    }

    fn execute(&mut self, _ctx: &mut ActionCtx) {}

    fn tick(&mut self, ctx: &mut ActionCtx, dt: f32) {
        let Some(board) = ctx.blackboard.as_deref_mut() else {
            ctx.finish_action();
            return;
        };

        let hunger = (board.get_float("hunger") - dt * 0.4).max(0.);
        board.set("hunger", BlackboardValue::Float(hunger));
        if hunger <= 0. {
            ctx.finish_action();
        }
    }
}

struct Flee;

impl ActionBehavior for Flee {
    fn calculate_custom_score(&mut self, _ctx: &ScoreCtx) -> CustomScore {
        CustomScore::Value(0.9)
    }

    fn execute(&mut self, _ctx: &mut ActionCtx) {}

    fn tick(&mut self, ctx: &mut ActionCtx, _dt: f32) {
        let threat: TagSet = ["threat.seen"].into_iter().collect();
        let still_threatened = ctx
            .tags
            .map(|tags| tags.has_any(&threat))
            .unwrap_or(false);

        if !still_threatened {
            ctx.finish_action();
        }
    }
}

fn spawn_forager(registry: Res<ActionRegistry>, mut commands: Commands) {
    let set = ActionSet::new("forager")
        .with_entry("Loiter", 1.)
        .with_entry("Eat", 1.)
        .with_entry("Flee", 1.);

    let mut brain = UtilityBrain::new();
    registry.spawn_from_set(&mut brain, &set);

    let mut board = Blackboard::new();
    board.set("hunger", BlackboardValue::Float(0.2));
    board.set("food_nearby", BlackboardValue::Bool(true));

    commands.spawn((brain, board, TagContainer::default()));
    println!("forager spawned");
}

/// Appetite builds over time; the Eat action works it back down.
fn hunger_rises(time: Res<Time>, mut boards: Query<&mut Blackboard>) {
    for mut board in boards.iter_mut() {
        let hunger = (board.get_float("hunger") + time.delta_secs() * 0.1).min(1.);
        board.set("hunger", BlackboardValue::Float(hunger));
    }
}

/// Scripted danger: a threat appears three seconds in and lingers for two.
fn direct_threats(time: Res<Time>, mut agents: Query<&mut TagContainer>) {
    let elapsed = time.elapsed_secs();
    for mut tags in agents.iter_mut() {
        if (3.0..5.0).contains(&elapsed) {
            tags.add_tag("threat.seen");
        } else {
            tags.remove_tag(&Tag::from("threat.seen"));
        }
    }
}

fn announce_switches(mut switches: MessageReader<ActionSwitched>) {
    for switch in switches.read() {
        println!(
            "switch: {} -> {} (score {:.3})",
            switch.previous.as_deref().unwrap_or("<nothing>"),
            switch.next,
            switch.score,
        );
    }
}

fn print_score_table(
    time: Res<Time>,
    mut next_print: Local<f32>,
    brains: Query<(&UtilityBrain, Option<&TagContainer>)>,
) {
    let elapsed = time.elapsed_secs();
    if elapsed < *next_print {
        return;
    }
    *next_print = elapsed + 1.;

    for (brain, tags) in brains.iter() {
        println!("--- t={elapsed:.1}s ---");
        for line in describe_brain(brain, tags, time.elapsed()) {
            println!("{line}");
        }
    }
}

fn exit_after_demo(time: Res<Time>, mut exit: MessageWriter<AppExit>) {
    if time.elapsed_secs() > 10. {
        exit.write(AppExit::Success);
    }
}

fn main() {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(25))),
        VolitionPlugin::default(),
    ));

    (&mut app)
        .register_action_kind("Loiter", || {
            (ActionConfig::new("Loiter"), Box::new(Loiter))
        })
        .register_action_kind("Eat", || (ActionConfig::new("Eat"), Box::new(Eat)))
        .register_action_kind("Flee", || {
            (
                ActionConfig::new("Flee")
                    .with_priority(3)
                    .with_require_tags(["threat.seen"].into_iter().collect()),
                Box::new(Flee),
            )
        });

    app.add_systems(Startup, spawn_forager)
        .add_systems(Update, (hunger_rises, direct_threats))
        .add_systems(
            Update,
            (announce_switches, print_score_table, exit_after_demo),
        );

    app.run();
}
