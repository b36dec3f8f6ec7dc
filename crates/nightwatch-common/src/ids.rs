//! Actor identifiers.
//!
//! Guards, the player and catchable props all share one id space so a
//! perception report or catch overlap can name any of them.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Next id handed out by [`EntityId::new`]. Zero is reserved for [`EntityId::NULL`].
static NEXT_ACTOR: AtomicU64 = AtomicU64::new(1);

/// Identifier of an actor in the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// No actor. Never returned by [`EntityId::new`].
    pub const NULL: Self = Self(0);

    /// Allocates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_ACTOR.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns false for [`EntityId::NULL`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::NULL.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
