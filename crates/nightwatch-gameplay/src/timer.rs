//! Cooperative single-fire timers.
//!
//! The guard never owns engine timer handles. It talks to a [`TimerService`]
//! injected at construction, asks for a timer in a named [`TimerSlot`], and
//! receives expired handles back from [`TimerService::update`] at its next
//! evaluation. Scheduling a slot that already has a pending timer cancels the
//! old one, so at most one timer per slot is ever in flight.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Named timer slots a guard can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerSlot {
    /// Stun expiry
    Stun,
    /// End of the first wake-up stage
    WakeUpStageOne,
    /// Investigation give-up
    Investigate,
    /// Search episode give-up
    SearchTimeout,
    /// End of a look-around pause at a search point
    LookAround,
    /// Hand-off of a caught player to the jail
    JailHandoff,
}

/// Opaque handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Scheduler for delayed, cancellable, single-fire callbacks.
pub trait TimerService {
    /// Schedules a timer in `slot` that expires after `duration` seconds.
    /// Any timer already pending in the same slot is cancelled.
    fn schedule(&mut self, slot: TimerSlot, duration: f32) -> TimerHandle;

    /// Cancels a pending timer. Returns false if it already fired or was
    /// cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Advances the clock by `dt` seconds and returns every timer that
    /// expired, in deadline order. Expired timers are no longer active.
    fn update(&mut self, dt: f32) -> Vec<TimerHandle>;

    /// Returns whether a handle is still pending.
    fn is_active(&self, handle: TimerHandle) -> bool;

    /// Number of pending timers.
    fn active_count(&self) -> usize;
}

/// A pending timer.
#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    handle: TimerHandle,
    slot: TimerSlot,
    deadline: f64,
}

/// Timer service driven by an explicit clock.
///
/// Time only moves when [`TimerService::update`] is called, which makes it
/// the natural fit for a fixed-step simulation and for tests.
#[derive(Debug, Default)]
pub struct ManualTimers {
    /// Seconds elapsed since creation
    now: f64,
    /// Next handle value
    next_handle: u64,
    /// Pending timers
    pending: Vec<PendingTimer>,
}

impl ManualTimers {
    /// Creates an empty timer service at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock value in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Seconds until a pending timer fires.
    #[must_use]
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.pending
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| (t.deadline - self.now).max(0.0) as f32)
    }

    /// Slot a pending timer was scheduled in.
    #[must_use]
    pub fn slot_of(&self, handle: TimerHandle) -> Option<TimerSlot> {
        self.pending.iter().find(|t| t.handle == handle).map(|t| t.slot)
    }
}

impl TimerService for ManualTimers {
    fn schedule(&mut self, slot: TimerSlot, duration: f32) -> TimerHandle {
        self.pending.retain(|t| t.slot != slot);

        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let deadline = self.now + f64::from(duration.max(0.0));
        self.pending.push(PendingTimer {
            handle,
            slot,
            deadline,
        });
        trace!("Timer {:?} scheduled in {:?} for t={:.3}", handle, slot, deadline);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        before != self.pending.len()
    }

    fn update(&mut self, dt: f32) -> Vec<TimerHandle> {
        self.now += f64::from(dt.max(0.0));
        let now = self.now;

        let mut expired: Vec<PendingTimer> =
            self.pending.iter().filter(|t| t.deadline <= now).copied().collect();
        if expired.is_empty() {
            return Vec::new();
        }

        self.pending.retain(|t| t.deadline > now);
        expired.sort_by(|a, b| {
            a.deadline
                .total_cmp(&b.deadline)
                .then_with(|| a.handle.cmp(&b.handle))
        });
        expired.into_iter().map(|t| t.handle).collect()
    }

    fn is_active(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    fn active_count(&self) -> usize {
        self.pending.len()
    }
}
