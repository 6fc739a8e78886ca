//! Boolean gameplay tags used for gating, busy checks, and interrupts.
//!
//! Tags are hierarchical, dot-separated strings: an agent that owns
//! `combat.melee.stunned` counts as matching a requirement for `combat.melee`.
//! The reverse does not hold - owning a parent does not grant its children.

use std::borrow::Borrow;
use std::collections::BTreeSet;

use bevy::prelude::*;

/// A single hierarchical tag.
///
/// A simple newtype wrapper whose main purpose is to future-proof the library
/// and allow for the implementations of assorted Traits that will not 'leak'
/// into the underlying, wrapped type.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `self` is `query` or a descendant of `query` in the tag hierarchy.
    pub fn matches(&self, query: &Tag) -> bool {
        self.0 == query.0
            || (self.0.len() > query.0.len()
                && self.0.starts_with(query.0.as_str())
                && self.0.as_bytes()[query.0.len()] == b'.')
    }
}

impl<IS: Into<String>> From<IS> for Tag {
    fn from(value: IS) -> Self {
        Self::from_string(value.into())
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An ordered set of tags.
///
/// Ordering is lexicographic over the tag strings; this keeps iteration
/// (and anything rendered from it) deterministic across runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Into<Tag>>(&mut self, tag: T) -> &mut Self {
        self.0.insert(tag.into());
        self
    }

    pub fn remove(&mut self, tag: &Tag) -> bool {
        self.0.remove(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// True if any owned tag matches `query` (hierarchically).
    pub fn has(&self, query: &Tag) -> bool {
        self.0.iter().any(|owned| owned.matches(query))
    }

    /// True if every tag in `queries` is matched by some owned tag.
    /// An empty query set is trivially satisfied.
    pub fn has_all(&self, queries: &TagSet) -> bool {
        queries.iter().all(|query| self.has(query))
    }

    /// True if at least one tag in `queries` is matched by some owned tag.
    /// An empty query set matches nothing.
    pub fn has_any(&self, queries: &TagSet) -> bool {
        queries.iter().any(|query| self.has(query))
    }
}

impl<T: Into<Tag>> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A composable predicate over a tag set.
///
/// Leaves check tag membership; `And`/`Or` combine sub-queries. An `Empty`
/// query is 'unconstrained' and callers are expected to skip evaluating it.
#[derive(Clone, Debug, Default)]
pub enum TagQuery {
    #[default]
    Empty,
    /// At least one of the listed tags is owned.
    AnyOf(TagSet),
    /// All of the listed tags are owned.
    AllOf(TagSet),
    /// None of the listed tags are owned.
    NoneOf(TagSet),
    And(Vec<TagQuery>),
    Or(Vec<TagQuery>),
}

impl TagQuery {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::AnyOf(tags) | Self::AllOf(tags) | Self::NoneOf(tags) => tags.is_empty(),
            Self::And(subqueries) | Self::Or(subqueries) => {
                subqueries.iter().all(|subquery| subquery.is_empty())
            }
        }
    }

    /// Evaluate the query against an owned-tag snapshot.
    ///
    /// `Empty` matches everything, so that composites containing it degrade
    /// gracefully rather than vetoing their siblings.
    pub fn matches(&self, owned: &TagSet) -> bool {
        match self {
            Self::Empty => true,
            Self::AnyOf(tags) => owned.has_any(tags),
            Self::AllOf(tags) => owned.has_all(tags),
            Self::NoneOf(tags) => !owned.has_any(tags),
            Self::And(subqueries) => subqueries.iter().all(|subquery| subquery.matches(owned)),
            Self::Or(subqueries) => subqueries.iter().any(|subquery| subquery.matches(owned)),
        }
    }
}

/// The tags an agent Entity currently owns.
///
/// This is the collaborator the gating checks consume. It is deliberately a
/// separate Component from the brain - other systems (status effects,
/// animation, scripted sequences) are expected to add and remove tags here
/// without knowing anything about action selection. A brain on an Entity
/// without a TagContainer treats every tag-constrained action as gated out.
#[derive(Component, Clone, Debug, Default)]
pub struct TagContainer {
    owned: TagSet,
}

impl TagContainer {
    pub fn new(owned: TagSet) -> Self {
        Self { owned }
    }

    pub fn owned_tags(&self) -> &TagSet {
        &self.owned
    }

    pub fn add_tag<T: Into<Tag>>(&mut self, tag: T) -> &mut Self {
        self.owned.insert(tag);
        self
    }

    pub fn remove_tag(&mut self, tag: &Tag) -> bool {
        self.owned.remove(tag)
    }

    pub fn has_all(&self, queries: &TagSet) -> bool {
        self.owned.has_all(queries)
    }

    pub fn has_any(&self, queries: &TagSet) -> bool {
        self.owned.has_any(queries)
    }
}

impl<T: Into<Tag>> FromIterator<T> for TagContainer {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            owned: iter.into_iter().collect(),
        }
    }
}
