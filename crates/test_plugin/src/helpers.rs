use bevy::prelude::*;

use volition_core::brain::UtilityBrain;
use volition_core::events::ActionSwitched;

/// Latches to true once any brain in the test World has picked an action.
///
/// Needed so 'exit when everything is idle' helpers don't fire on the very
/// first tick, before the scenario under test has had a chance to start.
#[derive(Resource, Default)]
pub struct SawAnyExecution(bool);

impl SawAnyExecution {
    pub fn get(&self) -> bool {
        self.0
    }

    pub fn set(&mut self, value: bool) {
        self.0 = value;
    }
}

/// Flips the [`SawAnyExecution`] latch on the first action switch.
pub fn mark_execution_occurred(
    mut seen: ResMut<SawAnyExecution>,
    mut switches: MessageReader<ActionSwitched>,
) {
    if switches.read().next().is_some() {
        seen.set(true);
    }
}

/// Ends the test app once every brain has gone back to idle - no current
/// action and nothing still winding down through an abort.
pub fn exit_when_all_brains_idle(
    seen: Res<SawAnyExecution>,
    brains: Query<&UtilityBrain>,
    mut exit: MessageWriter<AppExit>,
) {
    if !seen.get() {
        return;
    }

    let all_idle = brains.iter().all(|brain| {
        brain.current_action().is_none()
            && brain.actions().iter().all(|action| !action.is_executing())
    });

    if all_idle {
        exit.write(AppExit::Success);
    }
}
