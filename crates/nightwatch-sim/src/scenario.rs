//! Scenario files.
//!
//! A scenario is a guard profile plus a timeline of scripted perception
//! events, stored as TOML:
//!
//! ```toml
//! spawn = [0.0, 0.0, 0.0]
//! tick = 0.1
//! duration = 20.0
//! seed = 7
//!
//! [guard]
//! preferred_neutral_state = "patrolling"
//! patrol_locations = [[0.0, 0.0, 0.0], [400.0, 0.0, 0.0]]
//!
//! [[events]]
//! at = 2.0
//! kind = "sight"
//! location = [600.0, 0.0, 0.0]
//! ```

use std::fs;
use std::path::Path;

use nightwatch_common::{NightwatchError, Vec3};
use nightwatch_gameplay::{GuardError, GuardProfile};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Failed to read file.
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Guard profile is invalid.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Scenario failed validation.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// Result type for scenario operations.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

impl From<ScenarioError> for NightwatchError {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::Io(e) => NightwatchError::Io(e),
            ScenarioError::Parse(e) => NightwatchError::Serialization(e.to_string()),
            ScenarioError::Guard(e) => e.into(),
            ScenarioError::Invalid(msg) => NightwatchError::Config(msg),
        }
    }
}

/// Kind of scripted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Player seen at `location`
    Sight,
    /// Player lost, last seen at `location`
    Lost,
    /// Noise at `location`
    Noise,
    /// Stunning hit
    Stun,
    /// Player enters (`active = true`) or leaves the sleep-detect trigger
    SleepRange,
    /// Player touches the catch volume
    Overlap,
    /// Player starts (`active = true`) or stops aiming
    Aim,
    /// Guard is reset to its spawn
    Reset,
}

impl EventKind {
    /// Returns whether the event needs a `location`.
    #[must_use]
    pub const fn needs_location(self) -> bool {
        matches!(self, Self::Sight | Self::Lost | Self::Noise)
    }
}

/// One scripted event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    /// Simulation time in seconds
    pub at: f32,
    /// What happens
    pub kind: EventKind,
    /// Where it happens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec3>,
    /// For `overlap`: whether the catch succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catchable: Option<bool>,
    /// For `sleep_range` and `aim`: on or off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl ScenarioEvent {
    /// Creates an event without payload.
    #[must_use]
    pub const fn new(at: f32, kind: EventKind) -> Self {
        Self {
            at,
            kind,
            location: None,
            catchable: None,
            active: None,
        }
    }

    /// Sets the location.
    #[must_use]
    pub const fn with_location(mut self, location: Vec3) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the catchable flag.
    #[must_use]
    pub const fn with_catchable(mut self, catchable: bool) -> Self {
        self.catchable = Some(catchable);
        self
    }

    /// Sets the on/off flag.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }
}

/// A guard plus a perception timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Spawn position
    pub spawn: Vec3,
    /// Fixed step in seconds
    pub tick: f32,
    /// Total simulated time in seconds
    pub duration: f32,
    /// Seed for search point draws
    pub seed: Option<u64>,
    /// Guard profile
    pub guard: GuardProfile,
    /// Scripted events
    pub events: Vec<ScenarioEvent>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            spawn: Vec3::ZERO,
            tick: 0.1,
            duration: 10.0,
            seed: None,
            guard: GuardProfile::default(),
            events: Vec::new(),
        }
    }
}

impl Scenario {
    /// Parses and validates a scenario from TOML text.
    pub fn from_toml_str(content: &str) -> ScenarioResult<Self> {
        let scenario: Self = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Loads and validates a scenario from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ScenarioResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let scenario = Self::from_toml_str(&content)?;
        info!(
            "Loaded scenario from {} ({} events, {:.1}s)",
            path.display(),
            scenario.events.len(),
            scenario.duration
        );
        Ok(scenario)
    }

    /// Saves the scenario as TOML.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ScenarioResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ScenarioError::Invalid(format!("cannot serialize scenario: {e}")))?;
        fs::write(path, contents)?;
        debug!("Saved scenario to {}", path.display());
        Ok(())
    }

    /// Validates the scenario and its guard profile.
    pub fn validate(&self) -> ScenarioResult<()> {
        self.guard.validate()?;

        if self.tick.is_nan() || self.tick <= 0.0 {
            return Err(ScenarioError::Invalid(format!(
                "tick must be > 0, got {}",
                self.tick
            )));
        }
        if self.duration.is_nan() || self.duration < 0.0 {
            return Err(ScenarioError::Invalid(format!(
                "duration must be >= 0, got {}",
                self.duration
            )));
        }

        for (index, event) in self.events.iter().enumerate() {
            if event.at.is_nan() || event.at < 0.0 {
                return Err(ScenarioError::Invalid(format!(
                    "event {index} has negative time {}",
                    event.at
                )));
            }
            if event.kind.needs_location() && event.location.is_none() {
                return Err(ScenarioError::Invalid(format!(
                    "event {index} ({:?}) needs a location",
                    event.kind
                )));
            }
        }

        Ok(())
    }

    /// Events ordered by time. Events at the same time keep file order.
    #[must_use]
    pub fn timeline(&self) -> Vec<ScenarioEvent> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| a.at.total_cmp(&b.at));
        events
    }

    /// Number of fixed steps the scenario runs for.
    #[must_use]
    pub fn step_count(&self) -> usize {
        // Tolerate float noise so 2.0 / 0.1 is 20 steps, not 21.
        (self.duration / self.tick - 1e-3).ceil().max(0.0) as usize
    }
}
