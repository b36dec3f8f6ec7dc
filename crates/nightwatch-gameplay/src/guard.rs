//! Guard behaviour state machine.
//!
//! A [`Guard`] owns its runtime state exclusively and is evaluated once per
//! simulation frame through [`Guard::tick`]. Every collaborator (timers,
//! perception, navigation, catch arbitration) is injected at construction;
//! side effects leave the guard as [`GuardSignal`]s delivered to registered
//! observers.
//!
//! Evaluation order within a tick:
//! 1. sample perception and record facts (also while stunned)
//! 2. advance timers and handle expiries
//! 3. resolve deferred catch-volume overlaps
//! 4. apply a pending stun hit
//! 5. run the transition table for the current state
//! 6. move toward the current move target

use ahash::AHashMap;
use nightwatch_common::{EntityId, LightColor, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::catch::{CatchArbiter, CatchOutcome, CatchResolver};
use crate::perception::{PerceptionFacts, PerceptionSource};
use crate::profile::{GuardProfile, GuardResult};
use crate::search::{planar_distance, NavigationQuery, OpenGround, SearchPointGenerator};
use crate::signals::{GuardObserver, GuardObservers, GuardSignal};
use crate::state::{AnimationState, GuardState, Indicator};
use crate::timer::{TimerHandle, TimerService, TimerSlot};

// ============================================================================
// Construction types
// ============================================================================

/// Where a guard spawns and returns to on reset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpawnTransform {
    /// Spawn position
    pub position: Vec3,
    /// Facing around the up axis, radians
    pub yaw: f32,
}

impl SpawnTransform {
    /// Creates a spawn transform facing +X.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self { position, yaw: 0.0 }
    }
}

/// Services a guard depends on.
pub struct GuardCollaborators {
    /// Timer scheduling
    pub timers: Box<dyn TimerService>,
    /// Perception facts
    pub perception: Box<dyn PerceptionSource>,
    /// Navmesh projection for search points
    pub navigation: Box<dyn NavigationQuery>,
    /// Catch arbitration
    pub arbiter: Box<dyn CatchArbiter>,
}

impl GuardCollaborators {
    /// Bundles collaborators, with open-ground navigation.
    pub fn new(
        timers: impl TimerService + 'static,
        perception: impl PerceptionSource + 'static,
        arbiter: impl CatchArbiter + 'static,
    ) -> Self {
        Self {
            timers: Box::new(timers),
            perception: Box::new(perception),
            navigation: Box::new(OpenGround),
            arbiter: Box::new(arbiter),
        }
    }

    /// Replaces the navigation query.
    #[must_use]
    pub fn with_navigation(mut self, navigation: impl NavigationQuery + 'static) -> Self {
        self.navigation = Box::new(navigation);
        self
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Visibility of the overhead indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// "!" indicator
    pub alert: bool,
    /// "?" indicator
    pub question: bool,
    /// "Zzz" indicator
    pub zzz: bool,
}

impl IndicatorSet {
    /// Returns whether an indicator is shown.
    #[must_use]
    pub const fn get(&self, indicator: Indicator) -> bool {
        match indicator {
            Indicator::Alert => self.alert,
            Indicator::Question => self.question,
            Indicator::Zzz => self.zzz,
        }
    }

    fn set(&mut self, indicator: Indicator, visible: bool) {
        match indicator {
            Indicator::Alert => self.alert = visible,
            Indicator::Question => self.question = visible,
            Indicator::Zzz => self.zzz = visible,
        }
    }
}

/// Mutable state of one guard.
#[derive(Debug, Clone)]
pub struct GuardRuntime {
    /// Current behavioural state
    pub state: GuardState,
    /// `player_in_sight` as of the previous evaluation
    pub player_was_in_sight: bool,
    /// Player within sight range this evaluation
    pub player_in_sight: bool,
    /// Player inside the sleep-detect trigger
    pub player_in_sleep_detect_range: bool,
    /// Player in sight of a calm guard, building up to a chase
    pub alerting: bool,
    /// Seconds the player has been in sight during the current alert
    pub alert_progress: f32,
    /// Index of the current patrol waypoint
    pub patrol_index: usize,
    /// Where the guard is walking to
    pub move_target: Option<Vec3>,
    /// Noise being investigated
    pub investigate_target: Option<Vec3>,
    /// Centre of the current search episode
    pub search_origin: Vec3,
    /// Current search point
    pub search_point: Option<Vec3>,
    /// Pausing at a search point
    pub looking_around: bool,
    /// State to resume after a stun
    pub pre_stun_state: Option<GuardState>,
    /// Caught player waiting for the jail hand-off
    pub holding: Option<EntityId>,
    /// Player actor, as last perceived. A relation only.
    pub last_known_player: Option<EntityId>,
    /// Where the player was last seen in range
    pub last_known_location: Option<Vec3>,
    /// Current max walk speed
    pub max_speed: f32,
    /// Current head light color
    pub light: LightColor,
    /// Overhead indicators
    pub indicators: IndicatorSet,
    /// Player is aiming a projectile
    pub player_aiming: bool,
    /// Headshot target shown
    pub headshot_visible: bool,
    /// Pending timer per slot
    timers: AHashMap<TimerSlot, TimerHandle>,
}

impl GuardRuntime {
    fn new(state: GuardState, profile: &GuardProfile, origin: Vec3) -> Self {
        Self {
            state,
            player_was_in_sight: false,
            player_in_sight: false,
            player_in_sleep_detect_range: false,
            alerting: false,
            alert_progress: 0.0,
            patrol_index: 0,
            move_target: None,
            investigate_target: None,
            search_origin: origin,
            search_point: None,
            looking_around: false,
            pre_stun_state: None,
            holding: None,
            last_known_player: None,
            last_known_location: None,
            max_speed: 0.0,
            light: profile.normal_light,
            indicators: IndicatorSet::default(),
            player_aiming: false,
            headshot_visible: false,
            timers: AHashMap::new(),
        }
    }

    /// Pending timer in a slot.
    #[must_use]
    pub fn timer(&self, slot: TimerSlot) -> Option<TimerHandle> {
        self.timers.get(&slot).copied()
    }
}

// ============================================================================
// Guard
// ============================================================================

/// An AI guard.
pub struct Guard {
    id: EntityId,
    profile: GuardProfile,
    spawn: SpawnTransform,
    position: Vec3,
    yaw: f32,
    runtime: GuardRuntime,
    timers: Box<dyn TimerService>,
    perception: Box<dyn PerceptionSource>,
    navigation: Box<dyn NavigationQuery>,
    arbiter: Box<dyn CatchArbiter>,
    catch: CatchResolver,
    search: SearchPointGenerator,
    observers: GuardObservers,
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("runtime", &self.runtime)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl Guard {
    /// Creates a guard at its spawn, in its preferred neutral state.
    pub fn new(
        id: EntityId,
        profile: GuardProfile,
        spawn: SpawnTransform,
        collaborators: GuardCollaborators,
    ) -> GuardResult<Self> {
        profile.validate()?;

        let initial = profile.effective_neutral_state();
        let runtime = GuardRuntime::new(initial, &profile, spawn.position);
        let mut guard = Self {
            id,
            profile,
            spawn,
            position: spawn.position,
            yaw: spawn.yaw,
            runtime,
            timers: collaborators.timers,
            perception: collaborators.perception,
            navigation: collaborators.navigation,
            arbiter: collaborators.arbiter,
            catch: CatchResolver::new(),
            search: SearchPointGenerator::new(),
            observers: GuardObservers::new(),
        };
        guard.enter_state(initial);
        debug!("Guard {} spawned at {:?} in {:?}", id, spawn.position, initial);
        Ok(guard)
    }

    /// Makes search point draws deterministic.
    #[must_use]
    pub fn with_search_seed(mut self, seed: u64) -> Self {
        self.search = SearchPointGenerator::with_seed(seed);
        self
    }

    /// Registers an observer for this guard's signals.
    pub fn add_observer(&mut self, observer: Box<dyn GuardObserver>) {
        self.observers.register(observer);
    }

    // === Accessors ===

    /// Guard entity ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GuardState {
        self.runtime.state
    }

    /// State the guard settles in when nothing is going on.
    #[must_use]
    pub fn preferred_neutral_state(&self) -> GuardState {
        self.profile.effective_neutral_state()
    }

    /// Changes the preferred neutral state. Takes effect the next time the
    /// guard calms down or is reset.
    pub fn set_preferred_neutral_state(&mut self, state: GuardState) {
        self.profile.preferred_neutral_state = state;
    }

    /// Guard profile.
    #[must_use]
    pub const fn profile(&self) -> &GuardProfile {
        &self.profile
    }

    /// Runtime state.
    #[must_use]
    pub const fn runtime(&self) -> &GuardRuntime {
        &self.runtime
    }

    /// Spawn transform.
    #[must_use]
    pub const fn spawn(&self) -> SpawnTransform {
        self.spawn
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Current facing, radians.
    #[must_use]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Overrides the position, e.g. after the physics step resolved a
    /// collision.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Where the guard is walking to.
    #[must_use]
    pub const fn move_target(&self) -> Option<Vec3> {
        self.runtime.move_target
    }

    /// Current patrol waypoint, if the guard has a route.
    #[must_use]
    pub fn patrol_target(&self) -> Option<Vec3> {
        let route = self.profile.patrol_route();
        if route.is_empty() {
            None
        } else {
            Some(route[self.runtime.patrol_index % route.len()])
        }
    }

    /// Current search point.
    #[must_use]
    pub const fn search_point(&self) -> Option<Vec3> {
        self.runtime.search_point
    }

    /// Whether the guard is holding a caught player.
    #[must_use]
    pub const fn is_holding(&self) -> bool {
        self.runtime.holding.is_some()
    }

    /// Number of timers this guard has pending.
    #[must_use]
    pub fn active_timer_count(&self) -> usize {
        self.timers.active_count()
    }

    /// Snapshot for the animation collaborator.
    #[must_use]
    pub fn animation_state(&self) -> AnimationState {
        AnimationState {
            move_speed: self.runtime.max_speed,
            stunned: self.runtime.state == GuardState::Stunned,
            sleeping: self.runtime.state == GuardState::Sleeping,
            holding: self.runtime.holding.is_some(),
        }
    }

    // === Commands ===

    /// Transitions to `new_state`.
    ///
    /// No-op if the guard is already in that state. Otherwise the exit
    /// actions of the current state run, the state is assigned, the entry
    /// actions of the new state run and `StateChanged` is emitted. A
    /// follow-up transition requested by an entry action runs afterwards.
    pub fn set_state(&mut self, new_state: GuardState) {
        let mut next = Some(new_state);
        while let Some(target) = next.take() {
            let old = self.runtime.state;
            if target == old {
                break;
            }

            debug!("Guard {} {:?} -> {:?}", self.id, old, target);
            if target == GuardState::Stunned {
                self.runtime.pre_stun_state = Some(old);
            }
            self.emit(GuardSignal::StateExited(old));
            self.exit_state(old);

            self.runtime.state = target;
            self.emit(GuardSignal::StateEntered(target));
            next = self.enter_state(target);

            self.emit(GuardSignal::StateChanged { old, new: target });
        }
    }

    /// Sets the max walk speed.
    pub fn set_max_speed(&mut self, speed: f32) {
        let speed = speed.max(0.0);
        if self.runtime.max_speed != speed {
            self.runtime.max_speed = speed;
            self.emit(GuardSignal::SpeedChanged(speed));
        }
    }

    /// Queues an overlap on the catch volume. Resolved at the next
    /// evaluation, and only if the guard is chasing both now and then.
    pub fn on_catch_volume_overlap(&mut self, actor: EntityId) {
        self.catch.report_overlap(actor, self.runtime.state);
    }

    /// Tells the guard whether the player is aiming a projectile.
    pub fn set_player_aiming(&mut self, aiming: bool) {
        self.runtime.player_aiming = aiming;
        self.refresh_headshot_target(self.runtime.state == GuardState::Stunned);
    }

    /// Returns the guard to its spawn and preferred neutral state, with
    /// every timer cancelled and every flag cleared.
    pub fn reset_guard(&mut self) {
        let old = self.runtime.state;
        self.emit(GuardSignal::StateExited(old));
        self.exit_state(old);

        let slots: Vec<TimerSlot> = self.runtime.timers.keys().copied().collect();
        for slot in slots {
            self.cancel_timer(slot);
        }
        self.catch.clear();

        let preferred = self.profile.effective_neutral_state();
        let player_aiming = self.runtime.player_aiming;
        let headshot_visible = self.runtime.headshot_visible;
        let max_speed = self.runtime.max_speed;
        let light = self.runtime.light;
        let indicators = self.runtime.indicators;

        self.runtime = GuardRuntime::new(preferred, &self.profile, self.spawn.position);
        // Presentation state is left as is so entry actions only emit real changes.
        self.runtime.player_aiming = player_aiming;
        self.runtime.headshot_visible = headshot_visible;
        self.runtime.max_speed = max_speed;
        self.runtime.light = light;
        self.runtime.indicators = indicators;

        self.position = self.spawn.position;
        self.yaw = self.spawn.yaw;

        self.emit(GuardSignal::StateEntered(preferred));
        self.enter_state(preferred);
        if old != preferred {
            self.emit(GuardSignal::StateChanged {
                old,
                new: preferred,
            });
        }
        self.refresh_headshot_target(false);
        self.emit(GuardSignal::GuardReset);
        info!("Guard {} reset to {:?}", self.id, preferred);
    }

    /// Runs one evaluation step.
    pub fn tick(&mut self, dt: f32) {
        let dt = dt.max(0.0);

        let facts = self.perception.sample();
        self.record_facts(&facts);

        for handle in self.timers.update(dt) {
            if let Some(slot) = self.slot_of(handle) {
                self.runtime.timers.remove(&slot);
                self.on_timer_expired(slot);
            }
        }

        self.resolve_catches();

        if facts.stun_hit {
            self.stun();
        }

        if self.runtime.state != GuardState::Stunned && self.runtime.holding.is_none() {
            self.evaluate(&facts, dt);
        }

        self.advance_movement(dt);
    }

    // ========================================================================
    // Perception
    // ========================================================================

    fn sight_range(&self) -> f32 {
        if self.runtime.state == GuardState::Chasing {
            self.profile.losing_range()
        } else {
            self.profile.patrol_sight_range
        }
    }

    fn record_facts(&mut self, facts: &PerceptionFacts) {
        let in_sight = facts.player_visible
            && self.position.distance(facts.player_location) <= self.sight_range();

        self.runtime.player_was_in_sight = self.runtime.player_in_sight;
        self.runtime.player_in_sight = in_sight;
        self.runtime.player_in_sleep_detect_range = facts.player_in_sleep_detect_range;

        if facts.player.is_some() {
            self.runtime.last_known_player = facts.player;
        }
        if in_sight {
            self.runtime.last_known_location = Some(facts.player_location);
        }

        trace!(
            "Guard {} facts: visible={} in_sight={} noise={:?}",
            self.id,
            facts.player_visible,
            in_sight,
            facts.heard_noise_at
        );
    }

    // ========================================================================
    // Transition table
    // ========================================================================

    /// The neutral state a guard calms down into. Sleeping guards first
    /// settle as stationary and doze off on the next quiet evaluation.
    fn resting_state(&self) -> GuardState {
        match self.profile.effective_neutral_state() {
            GuardState::Sleeping => GuardState::Stationary,
            state => state,
        }
    }

    fn evaluate(&mut self, facts: &PerceptionFacts, dt: f32) {
        match self.runtime.state {
            GuardState::Stationary | GuardState::Patrolling => self.evaluate_neutral(facts, dt),
            GuardState::Sleeping => {
                if facts.heard_noise_at.is_some() || self.runtime.player_in_sleep_detect_range {
                    self.set_state(GuardState::WakeUpStageOne);
                }
            },
            GuardState::Investigating => {
                if self.runtime.player_in_sight {
                    self.set_state(GuardState::Chasing);
                } else if let Some(noise) = facts.heard_noise_at {
                    self.runtime.investigate_target = Some(noise);
                    self.runtime.move_target = Some(noise);
                    self.start_timer(TimerSlot::Investigate, self.profile.investigate_timeout);
                }
            },
            GuardState::Chasing => {
                if self.runtime.player_in_sight {
                    self.runtime.move_target = self.runtime.last_known_location;
                } else {
                    self.runtime.search_origin =
                        self.runtime.last_known_location.unwrap_or(self.position);
                    self.set_state(GuardState::Searching);
                }
            },
            GuardState::Searching => {
                if self.runtime.player_in_sight {
                    self.set_state(GuardState::Chasing);
                } else if let Some(noise) = facts.heard_noise_at {
                    self.runtime.investigate_target = Some(noise);
                    self.set_state(GuardState::Investigating);
                }
            },
            GuardState::WakeUpStageOne | GuardState::WakeUpStageTwo | GuardState::Stunned => {},
        }
    }

    fn evaluate_neutral(&mut self, facts: &PerceptionFacts, dt: f32) {
        if self.runtime.player_in_sight {
            if !self.runtime.alerting {
                self.begin_alert();
            }
            self.runtime.alert_progress += dt;
            if self.runtime.alert_progress >= self.profile.time_to_fully_alert {
                self.set_state(GuardState::Chasing);
            }
            return;
        }

        if self.runtime.alerting {
            self.end_alert();
        }

        if let Some(noise) = facts.heard_noise_at {
            self.runtime.investigate_target = Some(noise);
            self.set_state(GuardState::Investigating);
            return;
        }

        let quiet = !self.runtime.player_in_sleep_detect_range;
        if quiet
            && self.runtime.state == GuardState::Stationary
            && self.profile.effective_neutral_state() == GuardState::Sleeping
        {
            self.set_state(GuardState::Sleeping);
        }
    }

    fn begin_alert(&mut self) {
        self.runtime.alerting = true;
        self.runtime.alert_progress = 0.0;
        self.emit(GuardSignal::AlertBegan);
        self.set_indicator(Indicator::Question, true);
        self.set_light(self.profile.alerted_light);
    }

    fn end_alert(&mut self) {
        if !self.runtime.alerting {
            return;
        }
        self.runtime.alerting = false;
        self.runtime.alert_progress = 0.0;
        self.set_indicator(Indicator::Question, false);
        self.set_light(self.profile.normal_light);
        self.emit(GuardSignal::AlertEnded);
    }

    fn stun(&mut self) {
        if self.runtime.holding.is_some() {
            trace!("Guard {} ignores stun while holding the player", self.id);
            return;
        }
        if self.runtime.state == GuardState::Stunned {
            debug!("Guard {} re-stunned, restarting stun timer", self.id);
            self.start_timer(TimerSlot::Stun, self.profile.max_stun_time);
            return;
        }
        self.set_state(GuardState::Stunned);
    }

    // ========================================================================
    // Entry / exit actions
    // ========================================================================

    fn enter_state(&mut self, state: GuardState) -> Option<GuardState> {
        match state {
            GuardState::Stationary => {
                self.set_max_speed(0.0);
                self.set_light(self.profile.normal_light);
                self.hide_all_indicators();
            },
            GuardState::Sleeping => {
                self.set_max_speed(0.0);
                self.set_light(self.profile.normal_light);
                self.set_indicator(Indicator::Zzz, true);
            },
            GuardState::WakeUpStageOne => {
                self.set_max_speed(0.0);
                self.set_indicator(Indicator::Question, true);
                self.start_timer(TimerSlot::WakeUpStageOne, self.profile.wake_up_stage_one_time);
            },
            GuardState::WakeUpStageTwo => {
                return Some(if self.runtime.player_in_sight {
                    GuardState::Chasing
                } else {
                    self.resting_state()
                });
            },
            GuardState::Patrolling => {
                self.set_max_speed(self.profile.patrol_speed);
                self.set_light(self.profile.normal_light);
                self.runtime.move_target = self.patrol_target();
            },
            GuardState::Investigating => {
                self.set_max_speed(self.profile.patrol_speed);
                self.set_light(self.profile.alerted_light);
                self.set_indicator(Indicator::Question, true);
                self.runtime.move_target = self.runtime.investigate_target;
                self.start_timer(TimerSlot::Investigate, self.profile.investigate_timeout);
            },
            GuardState::Chasing => {
                self.set_max_speed(self.profile.chase_speed);
                self.set_light(self.profile.spotted_light);
                self.set_indicator(Indicator::Alert, true);
                self.runtime.move_target = self.runtime.last_known_location;
            },
            GuardState::Searching => {
                self.set_max_speed(self.profile.patrol_speed);
                self.set_light(self.profile.alerted_light);
                self.runtime.looking_around = false;
                self.pick_search_point();
                self.start_timer(TimerSlot::SearchTimeout, self.profile.search_timeout);
            },
            GuardState::Stunned => {
                self.set_max_speed(0.0);
                self.hide_all_indicators();
                self.refresh_headshot_target(true);
                self.emit(GuardSignal::StunBegan);
                self.start_timer(TimerSlot::Stun, self.profile.max_stun_time);
            },
        }
        None
    }

    fn exit_state(&mut self, state: GuardState) {
        match state {
            GuardState::Stationary | GuardState::Patrolling => self.end_alert(),
            GuardState::Sleeping => self.set_indicator(Indicator::Zzz, false),
            GuardState::WakeUpStageOne => {
                self.set_indicator(Indicator::Question, false);
                self.cancel_timer(TimerSlot::WakeUpStageOne);
            },
            GuardState::WakeUpStageTwo => {},
            GuardState::Investigating => {
                self.set_indicator(Indicator::Question, false);
                self.cancel_timer(TimerSlot::Investigate);
            },
            GuardState::Chasing => self.set_indicator(Indicator::Alert, false),
            GuardState::Searching => {
                self.cancel_timer(TimerSlot::SearchTimeout);
                self.cancel_timer(TimerSlot::LookAround);
                self.runtime.looking_around = false;
                self.runtime.search_point = None;
            },
            GuardState::Stunned => {
                self.cancel_timer(TimerSlot::Stun);
                self.runtime.pre_stun_state = None;
                self.emit(GuardSignal::StunEnded);
                self.refresh_headshot_target(false);
            },
        }
        self.runtime.move_target = None;
    }

    // ========================================================================
    // Timers
    // ========================================================================

    fn start_timer(&mut self, slot: TimerSlot, duration: f32) {
        if let Some(previous) = self.runtime.timers.remove(&slot) {
            self.timers.cancel(previous);
        }
        let handle = self.timers.schedule(slot, duration);
        self.runtime.timers.insert(slot, handle);
        debug!("Guard {} scheduled {:?} in {:.2}s", self.id, slot, duration);
    }

    fn cancel_timer(&mut self, slot: TimerSlot) {
        if let Some(handle) = self.runtime.timers.remove(&slot) {
            self.timers.cancel(handle);
        }
    }

    fn slot_of(&self, handle: TimerHandle) -> Option<TimerSlot> {
        self.runtime
            .timers
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(slot, _)| *slot)
    }

    fn on_timer_expired(&mut self, slot: TimerSlot) {
        debug!("Guard {} timer {:?} expired", self.id, slot);
        match slot {
            TimerSlot::Stun => {
                if self.runtime.state != GuardState::Stunned {
                    return;
                }
                let resume = self
                    .runtime
                    .pre_stun_state
                    .take()
                    .filter(|s| s.is_recoverable_after_stun())
                    .unwrap_or_else(|| self.resting_state());
                self.set_state(resume);
            },
            TimerSlot::WakeUpStageOne => {
                if self.runtime.state == GuardState::WakeUpStageOne {
                    self.set_state(GuardState::WakeUpStageTwo);
                }
            },
            TimerSlot::Investigate => {
                if self.runtime.state == GuardState::Investigating {
                    self.set_state(self.resting_state());
                }
            },
            TimerSlot::SearchTimeout => {
                if self.runtime.state == GuardState::Searching {
                    self.set_state(self.resting_state());
                }
            },
            TimerSlot::LookAround => {
                if self.runtime.state == GuardState::Searching {
                    self.runtime.looking_around = false;
                    self.pick_search_point();
                }
            },
            TimerSlot::JailHandoff => {
                if let Some(player) = self.runtime.holding.take() {
                    info!("Guard {} sending player {} to jail", self.id, player);
                    self.emit(GuardSignal::SendPlayerToJail { player });
                    self.set_state(self.resting_state());
                }
            },
        }
    }

    // ========================================================================
    // Catching
    // ========================================================================

    fn resolve_catches(&mut self) {
        let outcome = self
            .catch
            .resolve(self.runtime.state, self.arbiter.as_mut());

        match outcome {
            Some(CatchOutcome::Caught(player)) => {
                info!("Guard {} caught player {}", self.id, player);
                self.emit(GuardSignal::PlayerCaught { player });
                self.runtime.holding = Some(player);
                self.set_state(GuardState::Stationary);
                self.start_timer(TimerSlot::JailHandoff, self.profile.catch_hold_time);
            },
            Some(CatchOutcome::Failed(player)) => {
                info!("Guard {} failed to catch player {}", self.id, player);
                self.emit(GuardSignal::CatchFailed { player });
                self.runtime.search_origin =
                    self.runtime.last_known_location.unwrap_or(self.position);
                self.set_state(GuardState::Searching);
            },
            None => {},
        }
    }

    // ========================================================================
    // Searching
    // ========================================================================

    fn pick_search_point(&mut self) {
        let point = self.search.generate_navigable(
            self.runtime.search_origin,
            self.profile.search_radius_min,
            self.profile.search_radius_max,
            self.profile.navigation_retry_cap,
            self.navigation.as_ref(),
        );
        debug!("Guard {} searching at {:?}", self.id, point);
        self.runtime.search_point = Some(point);
        self.runtime.move_target = Some(point);
        self.emit(GuardSignal::SearchPointChosen(point));
    }

    // ========================================================================
    // Movement
    // ========================================================================

    fn advance_movement(&mut self, dt: f32) {
        let Some(target) = self.runtime.move_target else {
            return;
        };

        let acceptance = self.profile.acceptance_radius;
        if planar_distance(self.position, target) > acceptance {
            let offset = target - self.position;
            let distance = offset.length();
            let step = (self.runtime.max_speed * dt).min(distance);
            if step > 0.0 {
                self.position += offset / distance * step;
                self.yaw = offset.y.atan2(offset.x);
            }
        }

        if planar_distance(self.position, target) <= acceptance {
            self.on_arrived();
        }
    }

    fn on_arrived(&mut self) {
        match self.runtime.state {
            GuardState::Patrolling => {
                let len = self.profile.patrol_route().len();
                if len > 0 {
                    self.runtime.patrol_index = (self.runtime.patrol_index + 1) % len;
                    self.runtime.move_target = self.patrol_target();
                }
            },
            GuardState::Investigating => {
                debug!("Guard {} found nothing at the noise", self.id);
                self.set_state(self.resting_state());
            },
            GuardState::Searching => {
                if self.runtime.looking_around {
                    return;
                }
                self.runtime.move_target = None;
                if self.profile.look_around_time > 0.0 {
                    self.runtime.looking_around = true;
                    self.emit(GuardSignal::LookAroundStarted);
                    self.start_timer(TimerSlot::LookAround, self.profile.look_around_time);
                } else {
                    self.pick_search_point();
                }
            },
            _ => {},
        }
    }

    // ========================================================================
    // Presentation
    // ========================================================================

    fn emit(&mut self, signal: GuardSignal) {
        trace!("Guard {} signal {:?}", self.id, signal);
        self.observers.notify(self.id, &signal);
    }

    fn set_light(&mut self, color: LightColor) {
        if self.runtime.light != color {
            self.runtime.light = color;
            self.emit(GuardSignal::LightChanged(color));
        }
    }

    fn set_indicator(&mut self, indicator: Indicator, visible: bool) {
        if self.runtime.indicators.get(indicator) != visible {
            self.runtime.indicators.set(indicator, visible);
            self.emit(GuardSignal::IndicatorToggled { indicator, visible });
        }
    }

    fn hide_all_indicators(&mut self) {
        for indicator in Indicator::ALL {
            self.set_indicator(indicator, false);
        }
    }

    fn refresh_headshot_target(&mut self, stunned: bool) {
        let visible = self.runtime.player_aiming && !stunned;
        if self.runtime.headshot_visible != visible {
            self.runtime.headshot_visible = visible;
            self.emit(GuardSignal::HeadshotTargetToggled(visible));
        }
    }
}
