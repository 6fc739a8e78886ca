//! Score bookkeeping and combination.

use bevy::prelude::*;

use crate::types::{self, Score};

/// How a list of sub-scores is reduced to a single scalar.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScoreOperator {
    #[default]
    Multiply,
    Max,
    Min,
}

/// One named sub-score contributing to an action's combined utility.
#[derive(Reflect, Clone, Debug, PartialEq)]
pub struct ScoreElement {
    pub name: String,
    pub value: Score,
}

impl ScoreElement {
    pub fn new<IS: Into<String>>(name: IS, value: Score) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The diagnostic breakdown of an action's last score computation.
///
/// Rebuilt (cleared, then repopulated) on every recomputation - readers never
/// observe a partially stale mix of old and new elements.
#[derive(Clone, Debug, Default)]
pub struct ScoreElements {
    elements: Vec<ScoreElement>,
    operator: ScoreOperator,
}

impl ScoreElements {
    pub fn clear(&mut self) {
        self.elements.clear();
        self.operator = ScoreOperator::default();
    }

    pub fn record(&mut self, element: ScoreElement) -> &mut Self {
        self.elements.push(element);
        self
    }

    pub fn set_operator(&mut self, operator: ScoreOperator) -> &mut Self {
        self.operator = operator;
        self
    }

    pub fn operator(&self) -> ScoreOperator {
        self.operator
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreElement> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// True if two scores are within the equality tolerance of each other.
pub fn nearly_equal(a: Score, b: Score) -> bool {
    (a - b).abs() <= types::SCORE_EQUALITY_TOLERANCE
}

/// Reduce a list of sub-scores with the given operator.
///
/// An empty list always yields zero, regardless of operator.
///
/// Min reduces from an identity of 1; sub-scores are expected to stay within
/// the 0..=1 range, and a lone sub-score above 1 gets capped by the identity.
pub fn combine_scores(scores: &[Score], operator: ScoreOperator) -> Score {
    if scores.is_empty() {
        return types::MIN_SCORE;
    }

    match operator {
        ScoreOperator::Multiply => scores.iter().fold(1., |acc, score| acc * score),
        ScoreOperator::Max => scores.iter().fold(0., |acc: Score, score| acc.max(*score)),
        ScoreOperator::Min => scores.iter().fold(1., |acc: Score, score| acc.min(*score)),
    }
}

/// Combine an array of 0..1 scores with the given weights.
///
/// The result is normalized by the total weight so it stays in 0..1.
/// If the arrays disagree on length there is no sensible pairing, so the
/// combination degrades to zero (with a warning) rather than guessing.
pub fn combine_weighted_scores(scores: &[Score], weights: &[Score]) -> Score {
    if scores.len() != weights.len() {
        #[cfg(feature = "logging")]
        bevy::log::warn!(
            "combine_weighted_scores: Weights array must have the same length as Scores ({:?} vs {:?})",
            weights.len(),
            scores.len(),
        );
        return 0.;
    }

    let total_weight: Score = weights.iter().sum();
    if total_weight <= 0. {
        return 0.;
    }

    let total_score: Score = scores
        .iter()
        .zip(weights.iter())
        .map(|(score, weight)| score * weight)
        .sum();

    total_score / total_weight
}
