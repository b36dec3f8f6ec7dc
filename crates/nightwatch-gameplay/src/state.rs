//! Guard behavioural states and the indicators they drive.

use serde::{Deserialize, Serialize};

/// Behavioural state of a guard. Exactly one is active per guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Standing still at its post
    #[default]
    Stationary,
    /// Asleep at its post
    Sleeping,
    /// Woken by a stimulus, still getting up
    WakeUpStageOne,
    /// Fully awake, deciding what to do next
    WakeUpStageTwo,
    /// Walking the patrol route
    Patrolling,
    /// Checking out a noise
    Investigating,
    /// Running after the player
    Chasing,
    /// Lost the player, sweeping the area
    Searching,
    /// Knocked out for a while
    Stunned,
}

impl GuardState {
    /// All states, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Stationary,
        Self::Sleeping,
        Self::WakeUpStageOne,
        Self::WakeUpStageTwo,
        Self::Patrolling,
        Self::Investigating,
        Self::Chasing,
        Self::Searching,
        Self::Stunned,
    ];

    /// Get display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Stationary => "Stationary",
            Self::Sleeping => "Sleeping",
            Self::WakeUpStageOne => "Waking (1)",
            Self::WakeUpStageTwo => "Waking (2)",
            Self::Patrolling => "Patrolling",
            Self::Investigating => "Investigating",
            Self::Chasing => "Chasing",
            Self::Searching => "Searching",
            Self::Stunned => "Stunned",
        }
    }

    /// Returns whether this state can serve as a guard's resting state.
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        matches!(self, Self::Stationary | Self::Sleeping | Self::Patrolling)
    }

    /// Returns whether the guard is actively hunting in this state.
    #[must_use]
    pub const fn is_alerted(self) -> bool {
        matches!(self, Self::Investigating | Self::Chasing | Self::Searching)
    }

    /// Returns whether the guard can resume this state after a stun.
    #[must_use]
    pub const fn is_recoverable_after_stun(self) -> bool {
        !matches!(self, Self::Stunned | Self::WakeUpStageTwo | Self::Sleeping)
    }
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Overhead indicator meshes a guard can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// "!" shown while chasing
    Alert,
    /// "?" shown while something is off
    Question,
    /// "Zzz" shown while asleep
    Zzz,
}

impl Indicator {
    /// All indicators.
    pub const ALL: [Self; 3] = [Self::Alert, Self::Question, Self::Zzz];
}

/// Snapshot consumed by the animation collaborator each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationState {
    /// Current max movement speed
    pub move_speed: f32,
    /// Playing the stunned pose
    pub stunned: bool,
    /// Playing the sleeping pose
    pub sleeping: bool,
    /// Holding a caught player
    pub holding: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_states() {
        let neutral: Vec<_> = GuardState::ALL.into_iter().filter(|s| s.is_neutral()).collect();
        assert_eq!(
            neutral,
            vec![GuardState::Stationary, GuardState::Sleeping, GuardState::Patrolling]
        );
    }

    #[test]
    fn test_alerted_states() {
        assert!(GuardState::Chasing.is_alerted());
        assert!(GuardState::Searching.is_alerted());
        assert!(GuardState::Investigating.is_alerted());
        assert!(!GuardState::Stunned.is_alerted());
        assert!(!GuardState::Patrolling.is_alerted());
    }

    #[test]
    fn test_stun_recovery() {
        assert!(GuardState::Chasing.is_recoverable_after_stun());
        assert!(GuardState::WakeUpStageOne.is_recoverable_after_stun());
        assert!(!GuardState::Stunned.is_recoverable_after_stun());
        assert!(!GuardState::WakeUpStageTwo.is_recoverable_after_stun());
        assert!(!GuardState::Sleeping.is_recoverable_after_stun());
    }

    #[test]
    fn test_state_default_is_stationary() {
        assert_eq!(GuardState::default(), GuardState::Stationary);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(GuardState::Chasing.to_string(), "Chasing");
        assert_eq!(GuardState::WakeUpStageOne.to_string(), "Waking (1)");
    }
}
