//! Perception facts consumed by the guard.
//!
//! The engine's perception system reports sightings, noises and hits from
//! its own callbacks, at arbitrary points in the frame. Those reports go
//! through a [`PerceptionFeed`] into a [`PerceptionBuffer`] and are only
//! folded into a [`PerceptionFacts`] snapshot when the guard evaluates.

use crossbeam_channel::{bounded, Receiver, Sender};
use nightwatch_common::{EntityId, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default capacity of the perception channel.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// What a guard senses at one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerceptionFacts {
    /// The player actor, once it has been perceived at least once
    pub player: Option<EntityId>,
    /// Sight sense currently reports the player
    pub player_visible: bool,
    /// Last location the player was perceived at
    pub player_location: Vec3,
    /// Noise heard since the previous evaluation
    pub heard_noise_at: Option<Vec3>,
    /// Player is close enough to wake a sleeping guard
    pub player_in_sleep_detect_range: bool,
    /// Guard was hit by a stunning projectile since the previous evaluation
    pub stun_hit: bool,
}

/// Source of perception facts, sampled once per evaluation.
pub trait PerceptionSource {
    /// Returns the facts for this evaluation.
    fn sample(&mut self) -> PerceptionFacts;
}

/// Raw report from the engine's perception callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PerceptionEvent {
    /// Sight sense started or continued reporting the player
    PlayerSighted {
        /// Player actor
        player: EntityId,
        /// Where the player was seen
        location: Vec3,
    },
    /// Sight sense stopped reporting the player
    PlayerLost {
        /// Where the player was last seen
        location: Vec3,
    },
    /// Hearing sense picked up a noise
    NoiseHeard {
        /// Noise source
        location: Vec3,
    },
    /// Player entered or left the sleep-detect trigger
    SleepDetectRange {
        /// Whether the player is inside
        inside: bool,
    },
    /// Guard was hit by a stunning projectile
    StunHit,
}

/// Cloneable sending end handed to engine callbacks.
#[derive(Debug, Clone)]
pub struct PerceptionFeed {
    sender: Sender<PerceptionEvent>,
}

impl PerceptionFeed {
    /// Sends a raw event. Returns false if the buffer is full and the event
    /// was dropped.
    pub fn send(&self, event: PerceptionEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    /// Reports the player in sight at `location`.
    pub fn player_sighted(&self, player: EntityId, location: Vec3) -> bool {
        self.send(PerceptionEvent::PlayerSighted { player, location })
    }

    /// Reports the player out of sight, last seen at `location`.
    pub fn player_lost(&self, location: Vec3) -> bool {
        self.send(PerceptionEvent::PlayerLost { location })
    }

    /// Reports a noise at `location`.
    pub fn noise_heard(&self, location: Vec3) -> bool {
        self.send(PerceptionEvent::NoiseHeard { location })
    }

    /// Reports the player entering or leaving the sleep-detect trigger.
    pub fn sleep_detect_range(&self, inside: bool) -> bool {
        self.send(PerceptionEvent::SleepDetectRange { inside })
    }

    /// Reports a stunning hit.
    pub fn stun_hit(&self) -> bool {
        self.send(PerceptionEvent::StunHit)
    }
}

/// Buffers perception reports until the next evaluation.
///
/// Sight and sleep-range are levels and persist between samples. Noises and
/// stun hits are one-shot and are cleared once sampled.
#[derive(Debug)]
pub struct PerceptionBuffer {
    /// Sender template for new feeds
    sender: Sender<PerceptionEvent>,
    /// Receiver drained at sample time
    receiver: Receiver<PerceptionEvent>,
    /// Accumulated facts
    facts: PerceptionFacts,
}

impl Default for PerceptionBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl PerceptionBuffer {
    /// Creates a buffer with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            facts: PerceptionFacts::default(),
        }
    }

    /// Creates a new feed for engine callbacks.
    #[must_use]
    pub fn feed(&self) -> PerceptionFeed {
        PerceptionFeed {
            sender: self.sender.clone(),
        }
    }

    /// Number of reports waiting for the next sample.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Forgets everything sensed so far, including queued reports.
    pub fn clear(&mut self) {
        while self.receiver.try_recv().is_ok() {}
        self.facts = PerceptionFacts::default();
    }

    fn apply(&mut self, event: PerceptionEvent) {
        match event {
            PerceptionEvent::PlayerSighted { player, location } => {
                self.facts.player = Some(player);
                self.facts.player_visible = true;
                self.facts.player_location = location;
            },
            PerceptionEvent::PlayerLost { location } => {
                self.facts.player_visible = false;
                self.facts.player_location = location;
            },
            PerceptionEvent::NoiseHeard { location } => {
                self.facts.heard_noise_at = Some(location);
            },
            PerceptionEvent::SleepDetectRange { inside } => {
                self.facts.player_in_sleep_detect_range = inside;
            },
            PerceptionEvent::StunHit => {
                self.facts.stun_hit = true;
            },
        }
    }
}

impl PerceptionSource for PerceptionBuffer {
    fn sample(&mut self) -> PerceptionFacts {
        while let Ok(event) = self.receiver.try_recv() {
            trace!("Perception event {:?}", event);
            self.apply(event);
        }

        let snapshot = self.facts;
        self.facts.heard_noise_at = None;
        self.facts.stun_hit = false;
        snapshot
    }
}
