//! Side-effect notifications emitted by guards.
//!
//! Everything a guard wants the outside world to do (change walk speed,
//! recolor the head light, toggle an indicator, send the player to jail) is
//! expressed as a [`GuardSignal`] and delivered synchronously to each
//! registered [`GuardObserver`], in the order the guard emits them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use nightwatch_common::{EntityId, LightColor, Vec3};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::state::{GuardState, Indicator};

/// Notification emitted by a guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardSignal {
    /// Exit actions of a state are about to run
    StateExited(GuardState),
    /// Entry actions of a state are about to run
    StateEntered(GuardState),
    /// A transition completed
    StateChanged {
        /// State left
        old: GuardState,
        /// State entered
        new: GuardState,
    },
    /// Max walk speed changed
    SpeedChanged(f32),
    /// Head light recolored
    LightChanged(LightColor),
    /// Overhead indicator shown or hidden
    IndicatorToggled {
        /// Which indicator
        indicator: Indicator,
        /// Whether it is now visible
        visible: bool,
    },
    /// Headshot target shown or hidden
    HeadshotTargetToggled(bool),
    /// Player came into view of a calm guard
    AlertBegan,
    /// Alert build-up ended without a chase
    AlertEnded,
    /// Guard was knocked out
    StunBegan,
    /// Guard came to
    StunEnded,
    /// New search point picked
    SearchPointChosen(Vec3),
    /// Guard stopped to look around
    LookAroundStarted,
    /// Catch attempt succeeded
    PlayerCaught {
        /// Player actor
        player: EntityId,
    },
    /// Catch attempt failed
    CatchFailed {
        /// Player actor
        player: EntityId,
    },
    /// Caught player should be sent to jail
    SendPlayerToJail {
        /// Player actor
        player: EntityId,
    },
    /// Guard was reset to its spawn
    GuardReset,
}

/// Receives guard signals.
pub trait GuardObserver: Send {
    /// Called for every signal, synchronously, in emission order.
    fn on_signal(&mut self, guard: EntityId, signal: &GuardSignal);
}

/// Ordered list of observers.
#[derive(Default)]
pub struct GuardObservers {
    observers: Vec<Box<dyn GuardObserver>>,
}

impl std::fmt::Debug for GuardObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardObservers")
            .field("count", &self.observers.len())
            .finish()
    }
}

impl GuardObservers {
    /// Creates an empty observer list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Observers are notified in registration order.
    pub fn register(&mut self, observer: Box<dyn GuardObserver>) {
        self.observers.push(observer);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Delivers a signal to every observer.
    pub fn notify(&mut self, guard: EntityId, signal: &GuardSignal) {
        for observer in &mut self.observers {
            observer.on_signal(guard, signal);
        }
    }
}

/// Signal tagged with the guard that emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedSignal {
    /// Emitting guard
    pub guard: EntityId,
    /// Signal payload
    pub signal: GuardSignal,
}

/// Observer that forwards signals over a bounded channel, for hosts that
/// drain once per frame. Signals that do not fit are counted and dropped.
#[derive(Debug)]
pub struct SignalBus {
    sender: Sender<TaggedSignal>,
    receiver: Receiver<TaggedSignal>,
    dropped: Arc<AtomicUsize>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl SignalBus {
    /// Creates a bus holding at most `capacity` undrained signals.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates an observer publishing into this bus.
    #[must_use]
    pub fn observer(&self) -> Box<dyn GuardObserver> {
        Box::new(BusObserver {
            sender: self.sender.clone(),
            dropped: Arc::clone(&self.dropped),
        })
    }

    /// Takes every pending signal, oldest first.
    pub fn drain(&self) -> Vec<TaggedSignal> {
        self.receiver.try_iter().collect()
    }

    /// Signals waiting to be drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Signals lost because the bus was full.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct BusObserver {
    sender: Sender<TaggedSignal>,
    dropped: Arc<AtomicUsize>,
}

impl GuardObserver for BusObserver {
    fn on_signal(&mut self, guard: EntityId, signal: &GuardSignal) {
        let tagged = TaggedSignal {
            guard,
            signal: signal.clone(),
        };
        if let Err(err) = self.sender.try_send(tagged) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let lost = err.into_inner();
            trace!("Signal bus dropped {:?} from guard {}", lost.signal, lost.guard);
        }
    }
}

/// Observer that keeps every signal in a shared log.
#[derive(Debug, Clone, Default)]
pub struct SignalRecorder {
    log: Arc<Mutex<Vec<GuardSignal>>>,
}

impl SignalRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an observer appending to this recorder's log.
    #[must_use]
    pub fn observer(&self) -> Box<dyn GuardObserver> {
        Box::new(self.clone())
    }

    /// Returns a copy of the log.
    #[must_use]
    pub fn signals(&self) -> Vec<GuardSignal> {
        self.log.lock().clone()
    }

    /// Returns and clears the log.
    pub fn take(&self) -> Vec<GuardSignal> {
        std::mem::take(&mut *self.log.lock())
    }

    /// Number of recorded signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Counts recorded signals matching a predicate.
    pub fn count(&self, predicate: impl Fn(&GuardSignal) -> bool) -> usize {
        self.log.lock().iter().filter(|s| predicate(s)).count()
    }
}

impl GuardObserver for SignalRecorder {
    fn on_signal(&mut self, _guard: EntityId, signal: &GuardSignal) {
        self.log.lock().push(signal.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observers_notified_in_order() {
        let first = SignalRecorder::new();
        let second = SignalRecorder::new();
        let mut observers = GuardObservers::new();
        observers.register(first.observer());
        observers.register(second.observer());

        let guard = EntityId::new();
        observers.notify(guard, &GuardSignal::StunBegan);
        observers.notify(guard, &GuardSignal::StunEnded);

        assert_eq!(observers.len(), 2);
        assert_eq!(first.signals(), vec![GuardSignal::StunBegan, GuardSignal::StunEnded]);
        assert_eq!(second.signals(), first.signals());
    }

    #[test]
    fn test_bus_drain() {
        let bus = SignalBus::new(8);
        let mut observers = GuardObservers::new();
        observers.register(bus.observer());

        let guard = EntityId::new();
        observers.notify(guard, &GuardSignal::SpeedChanged(300.0));
        assert_eq!(bus.pending(), 1);

        let drained = bus.drain();
        assert_eq!(
            drained,
            vec![TaggedSignal {
                guard,
                signal: GuardSignal::SpeedChanged(300.0),
            }]
        );
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_bus_drops_when_full() {
        let bus = SignalBus::new(1);
        let mut observers = GuardObservers::new();
        observers.register(bus.observer());

        let guard = EntityId::new();
        observers.notify(guard, &GuardSignal::AlertBegan);
        observers.notify(guard, &GuardSignal::AlertEnded);

        assert_eq!(bus.dropped_count(), 1);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].signal, GuardSignal::AlertBegan);

        observers.notify(guard, &GuardSignal::AlertEnded);
        assert_eq!(bus.pending(), 1);
        assert_eq!(bus.dropped_count(), 1);
    }

    #[test]
    fn test_recorder_take_and_count() {
        let recorder = SignalRecorder::new();
        let mut observer = recorder.observer();
        let guard = EntityId::new();

        observer.on_signal(guard, &GuardSignal::AlertBegan);
        observer.on_signal(guard, &GuardSignal::AlertBegan);
        observer.on_signal(guard, &GuardSignal::AlertEnded);

        assert_eq!(recorder.count(|s| *s == GuardSignal::AlertBegan), 2);
        assert_eq!(recorder.take().len(), 3);
        assert!(recorder.is_empty());
    }
}
