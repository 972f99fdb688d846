//! Per-monster-type tuning and its validation.

use std::time::Duration;

use maze_haunt_core::{AttackPolicy, AttackRecovery};
use thiserror::Error;

/// Setup mistakes rejected when a pursuer is constructed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProfileError {
    /// The agent was given nowhere to patrol.
    #[error("pursuer needs at least one patrol point")]
    NoPatrolPoints,
    /// A distance, speed or health value was zero, negative or not finite.
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive {
        /// Name of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// A timer interval was zero.
    #[error("{field} must be longer than zero")]
    ZeroInterval {
        /// Name of the offending setting.
        field: &'static str,
    },
}

/// Teleport-on-stall behaviour for agents that get wedged in geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StallRecovery {
    /// Time between progress checks.
    pub check_interval: Duration,
    /// Minimum ground distance to cover between checks.
    pub radius: f32,
    /// How long the agent stays still after teleporting.
    pub freeze: Duration,
}

/// Tuning shared by every agent of one monster type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PursuitProfile {
    /// Ground speed while patrolling, in world units per second.
    pub patrol_speed: f32,
    /// Ground speed while chasing.
    pub chase_speed: f32,
    /// Range passed to the sensing predicate.
    pub detection_radius: f32,
    /// Ground distance at which a chasing agent starts attacking.
    pub attack_radius: f32,
    /// Minimum time between replans toward a moving target.
    pub replan_interval: Duration,
    /// Health the agent starts with.
    pub max_health: f32,
    /// How often the attack fires while the target stays in range.
    pub attack_policy: AttackPolicy,
    /// Where the agent goes when the target leaves attack range.
    pub attack_recovery: AttackRecovery,
    /// Optional teleport-on-stall behaviour.
    pub stall_recovery: Option<StallRecovery>,
    /// Walk to the last sensed target position before giving up a chase.
    pub investigate_last_known: bool,
    /// Seed for the teleport destination generator.
    pub seed: u64,
}

impl PursuitProfile {
    /// Checks every setting, returning the first invalid one.
    pub fn validate(&self) -> Result<(), ProfileError> {
        positive("patrol_speed", self.patrol_speed)?;
        positive("chase_speed", self.chase_speed)?;
        positive("detection_radius", self.detection_radius)?;
        positive("attack_radius", self.attack_radius)?;
        positive("max_health", self.max_health)?;
        nonzero("replan_interval", self.replan_interval)?;

        if let AttackPolicy::Cooldown { interval } = self.attack_policy {
            nonzero("attack_policy.interval", interval)?;
        }

        if let Some(stall) = &self.stall_recovery {
            nonzero("stall_recovery.check_interval", stall.check_interval)?;
            positive("stall_recovery.radius", stall.radius)?;
        }

        Ok(())
    }
}

impl Default for PursuitProfile {
    fn default() -> Self {
        Self {
            patrol_speed: 2.0,
            chase_speed: 3.5,
            detection_radius: 10.0,
            attack_radius: 1.5,
            replan_interval: Duration::from_secs(1),
            max_health: 100.0,
            attack_policy: AttackPolicy::OncePerEntry,
            attack_recovery: AttackRecovery::Chase,
            stall_recovery: None,
            investigate_last_known: false,
            seed: 0,
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ProfileError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProfileError::NonPositive { field, value })
    }
}

fn nonzero(field: &'static str, value: Duration) -> Result<(), ProfileError> {
    if value.is_zero() {
        Err(ProfileError::ZeroInterval { field })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        assert_eq!(PursuitProfile::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_values() {
        let profile = PursuitProfile {
            chase_speed: 0.0,
            ..PursuitProfile::default()
        };
        assert_eq!(
            profile.validate(),
            Err(ProfileError::NonPositive {
                field: "chase_speed",
                value: 0.0
            })
        );

        let profile = PursuitProfile {
            detection_radius: f32::NAN,
            ..PursuitProfile::default()
        };
        assert!(matches!(
            profile.validate(),
            Err(ProfileError::NonPositive {
                field: "detection_radius",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_intervals() {
        let profile = PursuitProfile {
            attack_policy: AttackPolicy::Cooldown {
                interval: Duration::ZERO,
            },
            ..PursuitProfile::default()
        };
        assert_eq!(
            profile.validate(),
            Err(ProfileError::ZeroInterval {
                field: "attack_policy.interval"
            })
        );

        let profile = PursuitProfile {
            stall_recovery: Some(StallRecovery {
                check_interval: Duration::ZERO,
                radius: 1.0,
                freeze: Duration::from_secs(2),
            }),
            ..PursuitProfile::default()
        };
        assert!(profile.validate().is_err());
    }
}
