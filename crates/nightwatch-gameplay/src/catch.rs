//! Catch resolution.
//!
//! Overlaps on the guard's catch volume come from the physics callbacks and
//! may arrive at any point in the frame. They are queued together with the
//! state the guard was in when the overlap was reported, and resolved at
//! the next evaluation only if the guard was chasing then and still is.

use nightwatch_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::state::GuardState;

/// Decides whether an actor is the player and whether it can be caught.
pub trait CatchArbiter {
    /// Returns whether `actor` is the player.
    fn is_player(&self, actor: EntityId) -> bool;

    /// Attempts to catch the player. Returns false if the player is
    /// currently protected from being caught.
    fn try_catch(&mut self, player: EntityId) -> bool;
}

/// Arbiter for a single player that can be flagged immune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerArbiter {
    player: EntityId,
    immune: bool,
}

impl PlayerArbiter {
    /// Creates an arbiter for `player`.
    #[must_use]
    pub const fn new(player: EntityId) -> Self {
        Self {
            player,
            immune: false,
        }
    }

    /// Marks the player as protected from (or exposed to) catches.
    pub fn set_immune(&mut self, immune: bool) {
        self.immune = immune;
    }

    /// Returns the player this arbiter guards.
    #[must_use]
    pub const fn player(&self) -> EntityId {
        self.player
    }
}

impl CatchArbiter for PlayerArbiter {
    fn is_player(&self, actor: EntityId) -> bool {
        actor == self.player
    }

    fn try_catch(&mut self, player: EntityId) -> bool {
        player == self.player && !self.immune
    }
}

/// Result of a resolved catch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatchOutcome {
    /// The player was caught
    Caught(EntityId),
    /// The player slipped away
    Failed(EntityId),
}

/// Overlap waiting for the next evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingOverlap {
    actor: EntityId,
    reported_in: GuardState,
}

/// Queues catch-volume overlaps and resolves them against the guard state.
#[derive(Debug, Default)]
pub struct CatchResolver {
    pending: Vec<PendingOverlap>,
}

impl CatchResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an overlap reported while the guard was in `state`.
    pub fn report_overlap(&mut self, actor: EntityId, state: GuardState) {
        self.pending.push(PendingOverlap {
            actor,
            reported_in: state,
        });
    }

    /// Number of queued overlaps.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drops every queued overlap.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Resolves queued overlaps against the current state.
    ///
    /// At most one catch attempt is made per call; the queue is always
    /// emptied.
    pub fn resolve<A: CatchArbiter + ?Sized>(
        &mut self,
        current: GuardState,
        arbiter: &mut A,
    ) -> Option<CatchOutcome> {
        if current != GuardState::Chasing {
            if !self.pending.is_empty() {
                trace!("Dropping {} overlaps while {:?}", self.pending.len(), current);
            }
            self.pending.clear();
            return None;
        }

        let candidate = self
            .pending
            .drain(..)
            .find(|o| o.reported_in == GuardState::Chasing && arbiter.is_player(o.actor))?;

        if arbiter.try_catch(candidate.actor) {
            Some(CatchOutcome::Caught(candidate.actor))
        } else {
            Some(CatchOutcome::Failed(candidate.actor))
        }
    }
}
