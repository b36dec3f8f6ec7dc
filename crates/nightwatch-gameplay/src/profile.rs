//! Guard configuration profiles.
//!
//! A [`GuardProfile`] is plain data: it is built in code or loaded from a
//! TOML file, validated once, and never changes while the guard is running.
//! Every field has a default so a profile file only needs to list what it
//! overrides.

use std::fs;
use std::path::Path;

use nightwatch_common::{LightColor, NightwatchError, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::state::GuardState;

/// Errors that can occur while building a guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Profile failed validation.
    #[error("Invalid guard profile: {0}")]
    InvalidProfile(String),

    /// Failed to parse TOML.
    #[error("Failed to parse guard profile TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to read file.
    #[error("Failed to read guard profile: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

impl From<GuardError> for NightwatchError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::InvalidProfile(msg) => NightwatchError::Config(msg),
            GuardError::Parse(e) => NightwatchError::Serialization(e.to_string()),
            GuardError::Io(e) => NightwatchError::Io(e),
        }
    }
}

/// Tunable behaviour of a single guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardProfile {
    // === Behaviour ===
    /// State the guard settles in when nothing is going on
    pub preferred_neutral_state: GuardState,
    /// Whether the guard walks its patrol route
    pub has_patrol_behaviour: bool,
    /// Ordered patrol waypoints, visited in a loop
    pub patrol_locations: Vec<Vec3>,

    // === Movement ===
    /// Max speed while patrolling, investigating and searching
    pub patrol_speed: f32,
    /// Max speed while chasing
    pub chase_speed: f32,
    /// Distance at which a move target counts as reached
    pub acceptance_radius: f32,

    // === Perception ===
    /// Detection range outside of a chase
    pub patrol_sight_range: f32,
    /// Sight range while chasing
    pub chasing_sight_range: f32,
    /// Extra range on top of `chasing_sight_range` before the player is lost
    pub losing_sight_range: f32,
    /// Seconds the player must stay in sight before a neutral guard gives chase
    pub time_to_fully_alert: f32,

    // === Timers ===
    /// Seconds a stun lasts
    pub max_stun_time: f32,
    /// Seconds spent in the first wake-up stage
    pub wake_up_stage_one_time: f32,
    /// Seconds before an unresolved investigation is abandoned
    pub investigate_timeout: f32,
    /// Seconds a search episode lasts without reacquiring the player
    pub search_timeout: f32,
    /// Seconds spent looking around at each search point
    pub look_around_time: f32,
    /// Seconds the guard holds a caught player before sending them to jail
    pub catch_hold_time: f32,

    // === Searching ===
    /// Inner radius of the search band
    pub search_radius_min: f32,
    /// Outer radius of the search band
    pub search_radius_max: f32,
    /// Redraws allowed when a search point cannot be projected onto the navmesh
    pub navigation_retry_cap: u32,

    // === Head light ===
    /// Head light color while calm
    pub normal_light: LightColor,
    /// Head light color while suspicious
    pub alerted_light: LightColor,
    /// Head light color while the player is spotted
    pub spotted_light: LightColor,
}

impl Default for GuardProfile {
    fn default() -> Self {
        Self {
            preferred_neutral_state: GuardState::Stationary,
            has_patrol_behaviour: true,
            patrol_locations: Vec::new(),

            patrol_speed: 300.0,
            chase_speed: 1000.0,
            acceptance_radius: 5.0,

            patrol_sight_range: 1500.0,
            chasing_sight_range: 2500.0,
            losing_sight_range: 500.0,
            time_to_fully_alert: 1.0,

            max_stun_time: 5.0,
            wake_up_stage_one_time: 2.0,
            investigate_timeout: 6.0,
            search_timeout: 12.0,
            look_around_time: 2.0,
            catch_hold_time: 1.5,

            search_radius_min: 100.0,
            search_radius_max: 150.0,
            navigation_retry_cap: 8,

            normal_light: LightColor::WHITE,
            alerted_light: LightColor::YELLOW,
            spotted_light: LightColor::RED,
        }
    }
}

impl GuardProfile {
    /// Sets the patrol route.
    #[must_use]
    pub fn with_patrol(mut self, waypoints: Vec<Vec3>) -> Self {
        self.patrol_locations = waypoints;
        self
    }

    /// Sets the preferred neutral state.
    #[must_use]
    pub const fn with_preferred_neutral_state(mut self, state: GuardState) -> Self {
        self.preferred_neutral_state = state;
        self
    }

    /// Sets the stun duration.
    #[must_use]
    pub const fn with_max_stun_time(mut self, seconds: f32) -> Self {
        self.max_stun_time = seconds;
        self
    }

    /// Sets the search band.
    #[must_use]
    pub const fn with_search_radius(mut self, min: f32, max: f32) -> Self {
        self.search_radius_min = min;
        self.search_radius_max = max;
        self
    }

    /// Range beyond which a chasing guard loses the player.
    #[must_use]
    pub fn losing_range(&self) -> f32 {
        self.chasing_sight_range + self.losing_sight_range
    }

    /// The preferred neutral state, or `Stationary` if the configured one
    /// is not a neutral state.
    #[must_use]
    pub fn effective_neutral_state(&self) -> GuardState {
        if self.preferred_neutral_state.is_neutral() {
            self.preferred_neutral_state
        } else {
            GuardState::Stationary
        }
    }

    /// Waypoints the guard actually walks. Empty when patrolling is disabled.
    #[must_use]
    pub fn patrol_route(&self) -> &[Vec3] {
        if self.has_patrol_behaviour {
            &self.patrol_locations
        } else {
            &[]
        }
    }

    /// Validates the profile.
    ///
    /// Problems the guard can live with (an empty route, a non-neutral
    /// preferred state) are logged and accepted.
    pub fn validate(&self) -> GuardResult<()> {
        let non_negative = [
            ("patrol_speed", self.patrol_speed),
            ("chase_speed", self.chase_speed),
            ("patrol_sight_range", self.patrol_sight_range),
            ("chasing_sight_range", self.chasing_sight_range),
            ("losing_sight_range", self.losing_sight_range),
            ("time_to_fully_alert", self.time_to_fully_alert),
            ("look_around_time", self.look_around_time),
            ("catch_hold_time", self.catch_hold_time),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(GuardError::InvalidProfile(format!(
                    "{name} must be >= 0, got {value}"
                )));
            }
        }

        let positive = [
            ("acceptance_radius", self.acceptance_radius),
            ("max_stun_time", self.max_stun_time),
            ("wake_up_stage_one_time", self.wake_up_stage_one_time),
            ("investigate_timeout", self.investigate_timeout),
            ("search_timeout", self.search_timeout),
            ("search_radius_min", self.search_radius_min),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(GuardError::InvalidProfile(format!(
                    "{name} must be > 0, got {value}"
                )));
            }
        }

        if self.search_radius_min > self.search_radius_max {
            return Err(GuardError::InvalidProfile(format!(
                "search_radius_min ({}) exceeds search_radius_max ({})",
                self.search_radius_min, self.search_radius_max
            )));
        }

        if self.has_patrol_behaviour && self.patrol_locations.is_empty() {
            warn!("Guard has patrol behaviour but no patrol locations, it will hold position");
        }

        if !self.preferred_neutral_state.is_neutral() {
            warn!(
                "Preferred neutral state {:?} is not neutral, falling back to Stationary",
                self.preferred_neutral_state
            );
        }

        Ok(())
    }

    /// Parses and validates a profile from TOML text.
    pub fn from_toml_str(content: &str) -> GuardResult<Self> {
        let profile: Self = toml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads and validates a profile from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let profile = Self::from_toml_str(&content)?;
        debug!("Loaded guard profile from {:?}", path);
        Ok(profile)
    }
}
