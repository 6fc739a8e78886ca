use bevy::prelude::*;

use volition_core::actionset::ActionRegistry;
use volition_core::debugger::ScoreDebugConfig;
use volition_core::decision_loop;
use volition_core::events::{ActionFinished, ActionSwitched};

#[cfg(feature = "include_actionset_loader")]
use volition_actionset_loader::{ActionSetAssetPlugin, json_support::JsonActionSetLoader};

pub struct VolitionPlugin {
    /// Override the app's fixed timestep with this decision interval, in
    /// seconds. `None` leaves whatever cadence the app already runs
    /// `FixedUpdate` at.
    pub decision_interval: Option<f64>,
}

impl Default for VolitionPlugin {
    fn default() -> Self {
        Self {
            // 25ms, decoupled from render framerate
            decision_interval: Some(0.025),
        }
    }
}

impl Plugin for VolitionPlugin {
    fn build(&self, app: &mut App) {
        #[cfg(feature = "include_actionset_loader")]
        app.add_plugins((ActionSetAssetPlugin::<JsonActionSetLoader>::default(),));

        if let Some(interval) = self.decision_interval {
            app.insert_resource(Time::<Fixed>::from_seconds(interval));
        }

        app.init_resource::<ActionRegistry>()
            .init_resource::<ScoreDebugConfig>()
            .add_message::<ActionSwitched>()
            .add_message::<ActionFinished>()
            .add_systems(FixedUpdate, decision_loop::utility_decision_tick);
    }
}
