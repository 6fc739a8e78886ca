//! Local, recoverable failure types.
//!
//! Nothing in the core propagates errors across the tick path; these types
//! exist so configuration-time callers can log what was refused and move on.

use crate::types::ActionKey;

/// Why a requested action spawn did not produce a new instance.
///
/// Neither variant is fatal: a duplicate kind leaves the existing instance
/// untouched, an unknown kind leaves the brain unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnRefusal {
    /// The brain already holds a live instance of this kind.
    DuplicateKind(ActionKey),
    /// No factory is registered for this kind.
    UnknownKind(ActionKey),
}

impl std::fmt::Display for SpawnRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKind(key) => {
                write!(f, "action kind {:?} is already instanced on this brain", key)
            }
            Self::UnknownKind(key) => {
                write!(f, "action kind {:?} is not registered", key)
            }
        }
    }
}
