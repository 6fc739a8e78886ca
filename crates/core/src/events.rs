//! Outbound notifications from the decision loop.
//!
//! These are one-way: the engine consumes its own synchronous finish flags
//! internally and only *emits* these Messages for user code to react to, so
//! handlers can never re-enter the brain mid-iteration.

use bevy::prelude::*;

use crate::types::{ActionKey, Score};

/// A brain switched its current action this tick.
///
/// `previous` is the displaced action's kind (it may still be winding down
/// through its abort at this point), `None` when the slot was empty.
#[derive(Message, Debug, Clone)]
pub struct ActionSwitched {
    /// The agent whose brain switched.
    pub entity: Entity,
    pub previous: Option<ActionKey>,
    pub next: ActionKey,
    /// The utility score the new action won selection with.
    pub score: Score,
}

/// An action returned to idle, whether by completing or by finishing its abort.
#[derive(Message, Debug, Clone)]
pub struct ActionFinished {
    pub entity: Entity,
    pub key: ActionKey,
}
