use bevy::{app::ScheduleRunnerPlugin, prelude::*};

#[cfg(feature = "logging")]
use bevy::log::LogPlugin;

use volition_core::debugger::ScoreDebugConfig;
use volition_core::decision_loop::utility_decision_tick;
use volition_core::events::{ActionFinished, ActionSwitched};

use crate::helpers::*;

pub struct VolitionTestPlugin;

impl Plugin for VolitionTestPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
                std::time::Duration::from_millis(200),
            )),
            #[cfg(feature = "logging")]
            LogPlugin {
                level: bevy::log::Level::DEBUG,
                custom_layer: |_| None,
                filter: "wgpu=error,bevy_render=info,bevy_ecs=info".to_string(),
                fmt_layer: |_| None,
            },
        ))
        .init_resource::<ScoreDebugConfig>()
        .init_resource::<SawAnyExecution>()
        .add_message::<ActionSwitched>()
        .add_message::<ActionFinished>()
        .insert_resource(Time::<Fixed>::from_seconds(0.025))
        .add_systems(FixedUpdate, utility_decision_tick)
        .add_systems(
            Last,
            (mark_execution_occurred, exit_when_all_brains_idle).chain(),
        );
    }
}
