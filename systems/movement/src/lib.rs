#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure movement helpers that step agents along planned paths.
//!
//! Movement happens on the ground plane only: the height of a waypoint is
//! never chased, so an agent keeps whatever `y` its host gives it.

use std::time::Duration;

use glam::Vec3;
use maze_haunt_core::Path;

/// Distance below which a waypoint counts as reached.
pub const DEFAULT_ARRIVAL_TOLERANCE: f32 = 0.5;

/// Distance between two points ignoring their heights.
#[must_use]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Outcome of advancing along a path for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FollowStep {
    /// Position after the step.
    pub position: Vec3,
    /// Index of the waypoint to head for next.
    pub cursor: usize,
    /// Whether the waypoint targeted at the start of the step was reached.
    pub arrived_at_waypoint: bool,
    /// Whether the cursor has passed the final waypoint.
    pub finished: bool,
}

/// Stateless path follower.
///
/// The follower only carries its arrival tolerance; everything that changes
/// between ticks is passed in and handed back through [`FollowStep`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathFollower {
    arrival_tolerance: f32,
}

impl PathFollower {
    /// Creates a follower that treats waypoints closer than `arrival_tolerance` as reached.
    #[must_use]
    pub const fn new(arrival_tolerance: f32) -> Self {
        Self { arrival_tolerance }
    }

    /// Distance below which a waypoint counts as reached.
    #[must_use]
    pub const fn arrival_tolerance(&self) -> f32 {
        self.arrival_tolerance
    }

    /// Moves `position` toward `path[cursor]` by at most `speed * dt`.
    ///
    /// At most one waypoint is consumed per call. An empty path, or a cursor
    /// already past the final waypoint, leaves the position untouched and
    /// reports `finished`.
    #[must_use]
    pub fn advance(
        &self,
        path: &Path,
        cursor: usize,
        position: Vec3,
        speed: f32,
        dt: Duration,
    ) -> FollowStep {
        let Some(waypoint) = path.get(cursor) else {
            return FollowStep {
                position,
                cursor,
                arrived_at_waypoint: false,
                finished: true,
            };
        };

        let moved = self.approach(position, waypoint, speed, dt);

        if planar_distance(moved, waypoint) < self.arrival_tolerance {
            let next = cursor + 1;
            return FollowStep {
                position: moved,
                cursor: next,
                arrived_at_waypoint: true,
                finished: next >= path.len(),
            };
        }

        FollowStep {
            position: moved,
            cursor,
            arrived_at_waypoint: false,
            finished: false,
        }
    }

    /// Moves `position` straight toward `target` by at most `speed * dt`,
    /// ignoring obstacles and keeping the current height.
    ///
    /// Used for the last stretch inside a single cell, where a planned path
    /// can only reach the cell centre.
    #[must_use]
    pub fn approach(&self, position: Vec3, target: Vec3, speed: f32, dt: Duration) -> Vec3 {
        let target = Vec3::new(target.x, position.y, target.z);
        let budget = (speed * dt.as_secs_f32()).max(0.0);
        step_toward(position, target, budget)
    }
}

impl Default for PathFollower {
    fn default() -> Self {
        Self::new(DEFAULT_ARRIVAL_TOLERANCE)
    }
}

fn step_toward(from: Vec3, to: Vec3, budget: f32) -> Vec3 {
    let offset = to - from;
    let distance = offset.length();
    if distance <= budget || distance <= f32::EPSILON {
        to
    } else {
        from + offset * (budget / distance)
    }
}

/// Detects agents that stopped making progress.
///
/// Every `check_interval` the monitor compares the current position with the
/// one recorded at the previous check and reports a stall when the agent
/// covered less than `radius` on the ground plane in between.
#[derive(Clone, Debug, PartialEq)]
pub struct StallMonitor {
    check_interval: Duration,
    radius: f32,
    elapsed: Duration,
    anchor: Option<Vec3>,
}

impl StallMonitor {
    /// Creates a monitor with no recorded position.
    #[must_use]
    pub const fn new(check_interval: Duration, radius: f32) -> Self {
        Self {
            check_interval,
            radius,
            elapsed: Duration::ZERO,
            anchor: None,
        }
    }

    /// Time between checks.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Minimum distance an agent must cover between checks.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Restarts the interval from `position`.
    pub fn reset(&mut self, position: Vec3) {
        self.elapsed = Duration::ZERO;
        self.anchor = Some(position);
    }

    /// Accumulates `dt` and reports whether a check fired and found a stall.
    ///
    /// The first check after construction only records the position.
    pub fn observe(&mut self, position: Vec3, dt: Duration) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.check_interval {
            return false;
        }

        self.elapsed = Duration::ZERO;
        let stalled = self
            .anchor
            .is_some_and(|anchor| planar_distance(anchor, position) < self.radius);
        self.anchor = Some(position);
        stalled
    }
}
