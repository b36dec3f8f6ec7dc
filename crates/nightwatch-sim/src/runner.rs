//! Scenario driver.
//!
//! Feeds the scripted events into a guard's perception buffer at their
//! scheduled time, steps the guard at a fixed rate and records every signal
//! it emits together with the simulation time.

use std::sync::Arc;

use nightwatch_common::{EntityId, Vec3};
use nightwatch_gameplay::{
    CatchArbiter, Guard, GuardCollaborators, GuardSignal, GuardState, ManualTimers,
    PerceptionBuffer, PerceptionFeed, PlayerArbiter, SignalBus, SpawnTransform,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scenario::{EventKind, Scenario, ScenarioEvent, ScenarioResult};

/// Catch arbiter whose immunity flag the script can flip between overlaps.
#[derive(Debug, Clone)]
pub struct ScriptedArbiter {
    inner: Arc<Mutex<PlayerArbiter>>,
}

impl ScriptedArbiter {
    /// Creates an arbiter for `player`.
    #[must_use]
    pub fn new(player: EntityId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlayerArbiter::new(player))),
        }
    }

    /// Sets whether the next catch attempt succeeds.
    pub fn set_catchable(&self, catchable: bool) {
        self.inner.lock().set_immune(!catchable);
    }
}

impl CatchArbiter for ScriptedArbiter {
    fn is_player(&self, actor: EntityId) -> bool {
        self.inner.lock().is_player(actor)
    }

    fn try_catch(&mut self, player: EntityId) -> bool {
        self.inner.lock().try_catch(player)
    }
}

/// A signal with the context it was emitted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Simulation time at the end of the step
    pub time: f32,
    /// Guard state after the step
    pub state: GuardState,
    /// Guard position after the step
    pub position: Vec3,
    /// Guard facing after the step, radians
    pub yaw: f32,
    /// The signal
    pub signal: GuardSignal,
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Steps simulated
    pub steps: usize,
    /// State at the end of the run
    pub final_state: GuardState,
    /// Position at the end of the run
    pub final_position: Vec3,
    /// Seconds spent investigating, chasing or searching
    pub alerted_time: f32,
    /// Signals lost to a full signal bus
    pub dropped_signals: usize,
    /// Every signal, in emission order
    pub trace: Vec<TraceEntry>,
}

impl RunReport {
    /// All completed transitions, in order.
    #[must_use]
    pub fn state_changes(&self) -> Vec<(GuardState, GuardState)> {
        self.trace
            .iter()
            .filter_map(|entry| match entry.signal {
                GuardSignal::StateChanged { old, new } => Some((old, new)),
                _ => None,
            })
            .collect()
    }

    /// Counts signals matching a predicate.
    pub fn count(&self, predicate: impl Fn(&GuardSignal) -> bool) -> usize {
        self.trace.iter().filter(|e| predicate(&e.signal)).count()
    }

    /// Serializes the trace as JSON lines.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let lines = self
            .trace
            .iter()
            .map(serde_json::to_string)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(lines.join("\n"))
    }
}

/// Runs one guard through a scenario.
#[derive(Debug)]
pub struct ScenarioRunner {
    scenario: Scenario,
    guard: Guard,
    feed: PerceptionFeed,
    bus: SignalBus,
    arbiter: ScriptedArbiter,
    player: EntityId,
    timeline: Vec<ScenarioEvent>,
    next_event: usize,
    steps: usize,
    alerted_time: f32,
    trace: Vec<TraceEntry>,
}

impl ScenarioRunner {
    /// Builds the guard and its collaborators for a scenario.
    pub fn new(scenario: Scenario) -> ScenarioResult<Self> {
        scenario.validate()?;

        let player = EntityId::new();
        let buffer = PerceptionBuffer::default();
        let feed = buffer.feed();
        let arbiter = ScriptedArbiter::new(player);
        let collaborators =
            GuardCollaborators::new(ManualTimers::new(), buffer, arbiter.clone());

        let mut guard = Guard::new(
            EntityId::new(),
            scenario.guard.clone(),
            SpawnTransform::at(scenario.spawn),
            collaborators,
        )?;
        if let Some(seed) = scenario.seed {
            guard = guard.with_search_seed(seed);
        }

        let bus = SignalBus::default();
        guard.add_observer(bus.observer());

        info!(
            "Guard {} ready in {:?} at {:?}",
            guard.id(),
            guard.state(),
            scenario.spawn
        );

        let timeline = scenario.timeline();
        Ok(Self {
            scenario,
            guard,
            feed,
            bus,
            arbiter,
            player,
            timeline,
            next_event: 0,
            steps: 0,
            alerted_time: 0.0,
            trace: Vec::new(),
        })
    }

    /// The guard being driven.
    #[must_use]
    pub const fn guard(&self) -> &Guard {
        &self.guard
    }

    /// The scripted player.
    #[must_use]
    pub const fn player(&self) -> EntityId {
        self.player
    }

    /// Simulation time at the start of the next step.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.steps as f32 * self.scenario.tick
    }

    /// Returns true once every step has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.steps >= self.scenario.step_count()
    }

    /// Applies due events and advances the guard by one tick.
    pub fn step(&mut self) {
        let now = self.time();
        while let Some(event) = self.timeline.get(self.next_event).copied() {
            if event.at > now {
                break;
            }
            self.apply(event);
            self.next_event += 1;
        }

        self.guard.tick(self.scenario.tick);
        self.steps += 1;
        if self.guard.state().is_alerted() {
            self.alerted_time += self.scenario.tick;
        }
        self.collect();
    }

    /// Runs the remaining steps and returns the report.
    #[must_use]
    pub fn run(mut self) -> RunReport {
        while !self.is_finished() {
            self.step();
        }

        info!(
            "Scenario finished after {} steps: {:?} at {:?}",
            self.steps,
            self.guard.state(),
            self.guard.position()
        );

        let dropped_signals = self.bus.dropped_count();
        if dropped_signals > 0 {
            warn!("Signal bus dropped {} signals, trace is incomplete", dropped_signals);
        }

        RunReport {
            steps: self.steps,
            final_state: self.guard.state(),
            final_position: self.guard.position(),
            alerted_time: self.alerted_time,
            dropped_signals,
            trace: self.trace,
        }
    }

    fn apply(&mut self, event: ScenarioEvent) {
        debug!("t={:.2} applying {:?}", event.at, event.kind);
        let location = event.location.unwrap_or_default();
        let delivered = match event.kind {
            EventKind::Sight => self.feed.player_sighted(self.player, location),
            EventKind::Lost => self.feed.player_lost(location),
            EventKind::Noise => self.feed.noise_heard(location),
            EventKind::Stun => self.feed.stun_hit(),
            EventKind::SleepRange => self.feed.sleep_detect_range(event.active.unwrap_or(true)),
            EventKind::Overlap => {
                self.arbiter.set_catchable(event.catchable.unwrap_or(true));
                self.guard.on_catch_volume_overlap(self.player);
                true
            },
            EventKind::Aim => {
                self.guard.set_player_aiming(event.active.unwrap_or(true));
                true
            },
            EventKind::Reset => {
                self.guard.reset_guard();
                true
            },
        };

        if !delivered {
            warn!("Perception feed full, dropped {:?} at t={:.2}", event.kind, event.at);
        }
    }

    fn collect(&mut self) {
        let time = self.time();
        let state = self.guard.state();
        let position = self.guard.position();
        let yaw = self.guard.yaw();
        for tagged in self.bus.drain() {
            self.trace.push(TraceEntry {
                time,
                state,
                position,
                yaw,
                signal: tagged.signal,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightwatch_gameplay::GuardProfile;

    fn scenario(profile: GuardProfile, duration: f32, events: Vec<ScenarioEvent>) -> Scenario {
        Scenario {
            duration,
            seed: Some(9),
            guard: profile,
            events,
            ..Scenario::default()
        }
    }

    #[test]
    fn test_quiet_scenario_stays_neutral() {
        let report = ScenarioRunner::new(scenario(GuardProfile::default(), 2.0, Vec::new()))
            .expect("scenario should build")
            .run();

        assert_eq!(report.steps, 20);
        assert_eq!(report.final_state, GuardState::Stationary);
        assert!(report.state_changes().is_empty());
        assert_eq!(report.alerted_time, 0.0);
    }

    #[test]
    fn test_patrol_loops_between_waypoints() {
        let profile = GuardProfile::default()
            .with_patrol(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)])
            .with_preferred_neutral_state(GuardState::Patrolling);
        let mut runner =
            ScenarioRunner::new(scenario(profile, 1.0, Vec::new())).expect("scenario should build");

        runner.step();
        runner.step();
        assert_eq!(runner.guard().position(), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(runner.guard().patrol_target(), Some(Vec3::ZERO));
        assert_eq!(runner.guard().yaw(), 0.0);

        runner.step();
        assert_eq!(runner.guard().position(), Vec3::ZERO);
        assert!((runner.guard().yaw() - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn test_stun_scenario_recovers_once() {
        let events = vec![
            ScenarioEvent::new(0.0, EventKind::Stun),
            ScenarioEvent::new(1.0, EventKind::Noise).with_location(Vec3::new(50.0, 0.0, 0.0)),
        ];
        let report = ScenarioRunner::new(scenario(GuardProfile::default(), 6.0, events))
            .expect("scenario should build")
            .run();

        assert_eq!(
            report.state_changes(),
            vec![
                (GuardState::Stationary, GuardState::Stunned),
                (GuardState::Stunned, GuardState::Stationary),
            ]
        );
        assert_eq!(report.count(|s| *s == GuardSignal::StunEnded), 1);
    }

    #[test]
    fn test_chase_and_catch() {
        let events = vec![
            ScenarioEvent::new(0.0, EventKind::Sight).with_location(Vec3::new(200.0, 0.0, 0.0)),
            ScenarioEvent::new(2.0, EventKind::Overlap).with_catchable(true),
        ];
        let runner = ScenarioRunner::new(scenario(GuardProfile::default(), 5.0, events))
            .expect("scenario should build");
        let player = runner.player();
        let report = runner.run();

        assert_eq!(report.count(|s| *s == GuardSignal::PlayerCaught { player }), 1);
        assert_eq!(report.count(|s| *s == GuardSignal::SendPlayerToJail { player }), 1);
    }

    #[test]
    fn test_failed_catch_starts_search() {
        let events = vec![
            ScenarioEvent::new(0.0, EventKind::Sight).with_location(Vec3::new(200.0, 0.0, 0.0)),
            ScenarioEvent::new(2.0, EventKind::Lost).with_location(Vec3::new(200.0, 0.0, 0.0)),
            ScenarioEvent::new(2.0, EventKind::Overlap).with_catchable(false),
        ];
        let report = ScenarioRunner::new(scenario(GuardProfile::default(), 2.5, events))
            .expect("scenario should build")
            .run();

        assert_eq!(report.count(|s| matches!(s, GuardSignal::CatchFailed { .. })), 1);
        assert_eq!(report.final_state, GuardState::Searching);
        assert!(report.alerted_time > 0.0);
        assert_eq!(report.dropped_signals, 0);
    }

    #[test]
    fn test_reset_event_returns_to_spawn() {
        let events = vec![
            ScenarioEvent::new(0.0, EventKind::Noise).with_location(Vec3::new(3000.0, 0.0, 0.0)),
            ScenarioEvent::new(2.0, EventKind::Reset),
        ];
        let report = ScenarioRunner::new(scenario(GuardProfile::default(), 2.5, events))
            .expect("scenario should build")
            .run();

        assert_eq!(report.final_state, GuardState::Stationary);
        assert_eq!(report.final_position, Vec3::ZERO);
        assert_eq!(report.count(|s| *s == GuardSignal::GuardReset), 1);
    }

    #[test]
    fn test_sleeper_demo_wakes_and_catches() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/sleeper.toml");
        let scenario = Scenario::load(path).expect("demo should load");
        let report = ScenarioRunner::new(scenario).expect("scenario should build").run();

        assert_eq!(
            report.state_changes()[..3],
            [
                (GuardState::Sleeping, GuardState::WakeUpStageOne),
                (GuardState::WakeUpStageOne, GuardState::WakeUpStageTwo),
                (GuardState::WakeUpStageTwo, GuardState::Chasing),
            ]
        );
        assert_eq!(report.count(|s| matches!(s, GuardSignal::PlayerCaught { .. })), 1);
    }

    #[test]
    fn test_trace_as_json_lines() {
        let events = vec![ScenarioEvent::new(0.0, EventKind::Aim).with_active(true)];
        let report = ScenarioRunner::new(scenario(GuardProfile::default(), 0.2, events))
            .expect("scenario should build")
            .run();

        let json = report.to_json_lines().expect("trace should serialize");
        assert_eq!(json.lines().count(), report.trace.len());
        assert!(json.contains("HeadshotTargetToggled"));
    }
}
