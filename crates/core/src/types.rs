//! Type aliases and shared numeric constants.

/// Type alias to make it easier to switch out what datatype is used for utility scores.
pub type Score = f32;

/// Priorities order actions when their scores are too close to call.
pub type Priority = i32;

/// Type alias to make it easier to switch out what datatypes are used for Actions.
/// Action keys identify action *kinds* - at most one live instance per kind per brain.
pub type ActionKey = String;

pub const MIN_SCORE: Score = 0.;
pub const MAX_SCORE: Score = 1.;

/// Scores at or below this value are treated as 'cannot execute'.
pub const EXECUTABLE_SCORE_EPSILON: Score = 1.0e-6;

/// Scores within this distance of each other are considered equal
/// for the purposes of the priority tie-break.
pub const SCORE_EQUALITY_TOLERANCE: Score = 1.0e-4;

/// The default margin a challenger must clear over an executing action
/// before the brain will switch to it.
pub const DEFAULT_SCORE_HYSTERESIS: Score = 0.02;
