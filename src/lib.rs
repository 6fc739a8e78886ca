#![doc = include_str!("../README.md")]

pub use volition_core::*;

pub mod prelude {
    pub use volition_core::action::{
        ActionBehavior, ActionConfig, ActionCtx, ActionInstance, CustomScore, ExecutionPhase,
        ScoreCtx, ScoringMethod,
    };
    pub use volition_core::actionset::{
        ActionRegistry, ActionSet, ActionSetEntry, RegistersActionKinds,
    };
    pub use volition_core::blackboard::{Blackboard, BlackboardValue};
    pub use volition_core::brain::{BrainCtx, StepReport, UtilityBrain};
    pub use volition_core::debugger::{ScoreDebugConfig, describe_brain};
    pub use volition_core::errors::SpawnRefusal;
    pub use volition_core::events::{ActionFinished, ActionSwitched};
    pub use volition_core::score::{
        ScoreElement, ScoreElements, ScoreOperator, combine_scores, combine_weighted_scores,
    };
    pub use volition_core::tags::{Tag, TagContainer, TagQuery, TagSet};
    pub use volition_core::types::*;

    #[cfg(any(feature = "bevy_plugin", feature = "testing"))]
    pub use volition_bevy_plugin::VolitionPlugin;

    #[cfg(feature = "testing")]
    pub use volition_test_plugin::VolitionTestPlugin;

    #[cfg(feature = "actionset_loader")]
    pub use volition_actionset_loader;
}
