//! Read-only inspection helpers: the always-compute toggle and a text
//! renderer for per-action scores.

use std::time::Duration;

use bevy::prelude::*;

use crate::brain::UtilityBrain;
use crate::tags::TagContainer;

/// A Resource that represents app-wide debug configuration for the scoring pass.
///
/// With `always_compute_scores` set, gated-out and frozen actions still
/// rebuild their scoring-element breakdowns every tick so inspection tools
/// have something to render. The committed scores - and therefore selection -
/// are unaffected; this only changes the inputs of the score-refresh step.
#[derive(Resource, Default, Debug)]
pub struct ScoreDebugConfig {
    always_compute_scores: bool,
}

impl ScoreDebugConfig {
    pub fn always_compute_scores(&self) -> bool {
        self.always_compute_scores
    }

    pub fn set_always_compute_scores(&mut self, enabled: bool) -> &mut Self {
        self.always_compute_scores = enabled;
        self
    }
}

/// Render a brain's actions as debug text, highest priority first.
///
/// Each action yields a status line and a bar line:
///
/// ```text
/// Flee (P3): 0.413 (EXECUTING)
///     |||||||||||||||||||||||||||||||||||||||||
/// ```
///
/// followed by one indented line per scoring element. Reads only public
/// state; safe to call from any render or logging layer.
pub fn describe_brain(
    brain: &UtilityBrain,
    tags: Option<&TagContainer>,
    now: Duration,
) -> Vec<String> {
    let mut by_priority: Vec<_> = brain.actions().iter().collect();
    by_priority.sort_by(|a, b| b.priority().cmp(&a.priority()));

    let mut lines = Vec::with_capacity(by_priority.len() * 2);
    for action in by_priority {
        let status = if action.is_executing() {
            "(EXECUTING)"
        } else if !action.tag_requirements_met(tags) {
            "(TAGS NOT MET)"
        } else if action.in_cooldown(now) {
            "(COOLDOWN)"
        } else {
            ""
        };

        lines.push(format!(
            "{} (P{}): {:.3} {}",
            action.name(),
            action.priority(),
            action.score(),
            status,
        ));

        let bar_len = (action.score().clamp(0., 1.) * 100.) as usize;
        lines.push(format!("\t{}", "|".repeat(bar_len)));

        for element in action.scoring_elements().iter() {
            lines.push(format!("\t{}: {:.3}", element.name, element.value));
        }
    }

    lines
}

/// Log every brain's score table. Heavy; meant to be added manually while
/// debugging, not part of the default plugin.
#[cfg(feature = "logging")]
pub fn log_brain_scores(
    time: Res<Time>,
    brains: Query<(Entity, &UtilityBrain, Option<&TagContainer>)>,
) {
    let now = time.elapsed();
    for (entity, brain, tags) in brains.iter() {
        for line in describe_brain(brain, tags, now) {
            bevy::log::debug!("{:?}: {}", entity, line);
        }
    }
}
