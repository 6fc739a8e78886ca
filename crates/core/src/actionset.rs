//! ActionSets: authorable collections of action kinds and their weights,
//! plus the registry that turns kinds into live instances.

use std::collections::HashMap;

use bevy::prelude::*;

#[cfg(feature = "actionset_loader")]
use bevy::asset::Asset;
#[cfg(feature = "actionset_loader")]
use bevy::reflect::TypePath;
#[cfg(feature = "actionset_loader")]
use serde::{Deserialize, Serialize};

use crate::action::{ActionBehavior, ActionConfig};
use crate::brain::UtilityBrain;
use crate::errors::SpawnRefusal;
use crate::types::{ActionKey, Score};

#[cfg(feature = "actionset_loader")]
fn default_weight() -> Score {
    1.
}

/// One authored entry: an action kind and its relative score weighting.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "actionset_loader", derive(Serialize, Deserialize))]
pub struct ActionSetEntry {
    pub kind: ActionKey,
    #[cfg_attr(feature = "actionset_loader", serde(default = "default_weight"))]
    pub weight: Score,
}

impl ActionSetEntry {
    pub fn new<IS: Into<ActionKey>>(kind: IS, weight: Score) -> Self {
        Self {
            kind: kind.into(),
            weight,
        }
    }
}

/// A collection of action kinds and their relative score weighting.
///
/// Entry order is preserved - it becomes the brain's insertion order, which
/// is the final selection tie-break.
#[derive(Clone, Debug, Default)]
#[cfg_attr(
    feature = "actionset_loader",
    derive(Asset, TypePath, Serialize, Deserialize)
)]
pub struct ActionSet {
    pub name: String,
    pub entries: Vec<ActionSetEntry>,
}

impl ActionSet {
    pub fn new<IS: Into<String>>(name: IS) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry<IS: Into<ActionKey>>(mut self, kind: IS, weight: Score) -> Self {
        self.entries.push(ActionSetEntry::new(kind, weight));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionSetEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort the entries by score weight, for presentation and debugging.
    ///
    /// Descending by weight, ascending by kind name when weights match.
    /// Spawn order (and therefore selection tie-breaking) is taken from the
    /// authored order, never from this.
    pub fn sort_by_weight(&mut self) {
        self.entries.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.kind.cmp(&b.kind))
        });
    }
}

/// A factory producing a fresh config + behavior pair for one action kind.
pub type ActionFactory = Box<dyn Fn() -> (ActionConfig, Box<dyn ActionBehavior>) + Send + Sync>;

/// Maps action kinds to their factories.
///
/// ActionSets are pure data (kind names and weights); this Resource is what
/// turns a kind name into an actual instance. Register factories at app
/// setup, then spawn sets into brains at runtime.
#[derive(Resource, Default)]
pub struct ActionRegistry {
    mapping: HashMap<ActionKey, ActionFactory>,
}

impl ActionRegistry {
    pub fn register<IS, F>(&mut self, kind: IS, factory: F) -> &mut Self
    where
        IS: Into<ActionKey>,
        F: Fn() -> (ActionConfig, Box<dyn ActionBehavior>) + Send + Sync + 'static,
    {
        self.mapping.insert(kind.into(), Box::new(factory));
        self
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.mapping.contains_key(kind)
    }

    /// Instantiate one kind onto a brain.
    ///
    /// Refuses (leaving the brain unchanged) if the kind is unknown or the
    /// brain already holds an instance of it. A non-negative
    /// `weight_override` replaces the factory's score weight; negative
    /// values mean 'keep the configured weight'.
    pub fn instantiate(
        &self,
        brain: &mut UtilityBrain,
        kind: &str,
        weight_override: Option<Score>,
    ) -> Result<(), SpawnRefusal> {
        let Some(factory) = self.mapping.get(kind) else {
            return Err(SpawnRefusal::UnknownKind(kind.to_owned()));
        };

        let (mut config, behavior) = factory();
        if let Some(weight) = weight_override {
            if weight >= 0. {
                config.score_weight = weight;
            }
        }

        brain.add_action(config, behavior)
    }

    /// Spawn every entry of a set onto a brain, in authored order.
    ///
    /// Refusals (duplicates, unknown kinds) are logged and skipped; the rest
    /// of the set still spawns.
    pub fn spawn_from_set(&self, brain: &mut UtilityBrain, set: &ActionSet) {
        for entry in set.iter() {
            match self.instantiate(brain, &entry.kind, Some(entry.weight)) {
                Ok(()) => {}
                Err(_refusal) => {
                    #[cfg(feature = "logging")]
                    bevy::log::debug!(
                        "ActionRegistry: skipping entry of set {:?}: {:}",
                        set.name,
                        _refusal,
                    );
                }
            }
        }
    }
}

/// Registration sugar mirroring how other engine extension points hook in.
pub trait RegistersActionKinds {
    fn register_action_kind<IS, F>(&mut self, kind: IS, factory: F) -> &mut Self
    where
        IS: Into<ActionKey>,
        F: Fn() -> (ActionConfig, Box<dyn ActionBehavior>) + Send + Sync + 'static;
}

impl RegistersActionKinds for World {
    fn register_action_kind<IS, F>(&mut self, kind: IS, factory: F) -> &mut Self
    where
        IS: Into<ActionKey>,
        F: Fn() -> (ActionConfig, Box<dyn ActionBehavior>) + Send + Sync + 'static,
    {
        let mut registry = self.get_resource_or_init::<ActionRegistry>();
        registry.register(kind, factory);
        self
    }
}

impl RegistersActionKinds for &mut App {
    fn register_action_kind<IS, F>(&mut self, kind: IS, factory: F) -> &mut Self
    where
        IS: Into<ActionKey>,
        F: Fn() -> (ActionConfig, Box<dyn ActionBehavior>) + Send + Sync + 'static,
    {
        self.world_mut().register_action_kind(kind, factory);
        self
    }
}
