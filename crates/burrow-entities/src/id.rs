//! Entity identifiers
//!
//! TigerStyle: Opaque ids, allocated monotonically, never reused.

use burrow_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier of a registered entity
///
/// Totally ordered and immutable. Two references denote the same entity
/// iff their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw id value
    ///
    /// Intended for tests and for the persistence layer that reloads ids.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Allocator of fresh entity ids
///
/// Starts after the largest id already in use, so ids persisted by an
/// earlier run are never handed out again.
#[derive(Debug)]
pub struct EntityIdFactory {
    largest_used: AtomicU64,
}

impl EntityIdFactory {
    /// Create a factory whose first id is `largest_used + 1`
    pub fn starting_after(largest_used: u64) -> Self {
        Self {
            largest_used: AtomicU64::new(largest_used),
        }
    }

    /// Allocate the next id
    ///
    /// # Errors
    /// Returns `EntityIdsExhausted` once `u64::MAX` has been handed out.
    pub fn next_id(&self) -> Result<EntityId> {
        self.largest_used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map(|previous| EntityId(previous + 1))
            .map_err(|last_id| Error::EntityIdsExhausted { last_id })
    }

    /// Largest id handed out so far
    pub fn largest_used(&self) -> u64 {
        self.largest_used.load(Ordering::SeqCst)
    }
}

impl Default for EntityIdFactory {
    fn default() -> Self {
        Self::starting_after(burrow_core::ENTITY_ID_LARGEST_USED_DEFAULT)
    }
}
