//! A typed key/value context store shared between actions and outside systems.
//!
//! Actions read the blackboard while scoring and publish results to it while
//! executing; gameplay systems fill it with whatever the agent perceives.
//! The engine itself never interprets the contents.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::tags::Tag;
use crate::types::Score;

/// The value types a blackboard entry may hold.
#[derive(Clone, Debug, PartialEq)]
pub enum BlackboardValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Entity(Entity),
    Tag(Tag),
}

/// A per-agent key/value store Component.
///
/// All getters degrade to a safe default when the key is missing or holds a
/// different type - a scoring function reading a stale or absent key gets a
/// zero-ish value, never a crash.
#[derive(Component, Clone, Debug, Default)]
pub struct Blackboard {
    values: HashMap<String, BlackboardValue>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<IS: Into<String>>(&mut self, key: IS, value: BlackboardValue) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&BlackboardValue> {
        self.values.get(key)
    }

    pub fn clear_value(&mut self, key: &str) -> Option<BlackboardValue> {
        self.values.remove(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(BlackboardValue::Bool(value)) => *value,
            _ => false,
        }
    }

    pub fn get_int(&self, key: &str) -> i32 {
        match self.values.get(key) {
            Some(BlackboardValue::Int(value)) => *value,
            _ => 0,
        }
    }

    pub fn get_float(&self, key: &str) -> Score {
        match self.values.get(key) {
            Some(BlackboardValue::Float(value)) => *value,
            _ => 0.,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(BlackboardValue::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn get_entity(&self, key: &str) -> Option<Entity> {
        match self.values.get(key) {
            Some(BlackboardValue::Entity(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_tag(&self, key: &str) -> Option<&Tag> {
        match self.values.get(key) {
            Some(BlackboardValue::Tag(value)) => Some(value),
            _ => None,
        }
    }
}
