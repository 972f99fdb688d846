#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Unified patrol, chase and attack state machine for pursuing agents.
//!
//! Every monster type is a [`PursuitProfile`] plus a [`Senses`] implementation
//! driving the same [`Pursuer`]. The host owns the loop: it calls
//! [`Pursuer::tick`] once per frame and applies the [`PursuitEvent`]s pushed
//! into its buffer.

mod profile;
mod senses;

use std::time::Duration;

use glam::Vec3;
use maze_haunt_core::{
    AgentId, AgentMode, AttackPolicy, AttackRecovery, Path, PlanError, PursuitEvent,
};
use maze_haunt_system_movement::{planar_distance, PathFollower, StallMonitor};
use maze_haunt_system_pathfinding::PathPlanner;
use maze_haunt_world::NavGrid;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

pub use profile::{ProfileError, PursuitProfile, StallRecovery};
pub use senses::{MazeBounds, RangeSenses, SenseQuery, Senses};

/// Read-only view of a pursuer for debug overlays and transcripts.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Agent identifier.
    pub id: AgentId,
    /// Current logical state.
    pub mode: AgentMode,
    /// Current world position.
    pub position: Vec3,
    /// Remaining health.
    pub health: f32,
    /// Path being followed.
    pub path: Path,
    /// Index of the waypoint being approached.
    pub cursor: usize,
    /// Patrol point the agent is heading for, or will resume toward.
    pub patrol_index: usize,
    /// Planning requests that produced no route so far.
    pub failed_plans: u32,
    /// Last sensed target position the agent is walking to after losing sight.
    pub investigating: Option<Vec3>,
}

/// One pursuing agent.
#[derive(Debug)]
pub struct Pursuer {
    id: AgentId,
    profile: PursuitProfile,
    patrol_points: Vec<Vec3>,
    mode: AgentMode,
    position: Vec3,
    health: f32,
    has_died: bool,
    path: Path,
    cursor: usize,
    patrol_index: usize,
    since_replan: Duration,
    patrol_retry: Duration,
    since_attack: Duration,
    frozen: Duration,
    failed_plans: u32,
    last_known: Option<Vec3>,
    investigating: Option<Vec3>,
    planner: PathPlanner,
    follower: PathFollower,
    stall: Option<StallMonitor>,
    rng: ChaCha8Rng,
}

impl Pursuer {
    /// Creates an inactive agent at `position` that will patrol `patrol_points` in order.
    pub fn new(
        id: AgentId,
        profile: PursuitProfile,
        patrol_points: Vec<Vec3>,
        position: Vec3,
    ) -> Result<Self, ProfileError> {
        profile.validate()?;
        if patrol_points.is_empty() {
            return Err(ProfileError::NoPatrolPoints);
        }

        let stall = profile.stall_recovery.map(|recovery| {
            let mut monitor = StallMonitor::new(recovery.check_interval, recovery.radius);
            monitor.reset(position);
            monitor
        });

        Ok(Self {
            id,
            profile,
            patrol_points,
            mode: AgentMode::Inactive,
            position,
            health: profile.max_health,
            has_died: false,
            path: Path::empty(),
            cursor: 0,
            patrol_index: 0,
            since_replan: Duration::ZERO,
            patrol_retry: Duration::ZERO,
            since_attack: Duration::ZERO,
            frozen: Duration::ZERO,
            failed_plans: 0,
            last_known: None,
            investigating: None,
            planner: PathPlanner::new(),
            follower: PathFollower::default(),
            stall,
            rng: ChaCha8Rng::seed_from_u64(profile.seed ^ u64::from(id.get())),
        })
    }

    /// Agent identifier.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current logical state.
    #[must_use]
    pub const fn mode(&self) -> AgentMode {
        self.mode
    }

    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Remaining health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Path being followed.
    #[must_use]
    pub const fn path(&self) -> &Path {
        &self.path
    }

    /// Tuning the agent was built with.
    #[must_use]
    pub const fn profile(&self) -> &PursuitProfile {
        &self.profile
    }

    /// Copies the agent's observable state.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            mode: self.mode,
            position: self.position,
            health: self.health,
            path: self.path.clone(),
            cursor: self.cursor,
            patrol_index: self.patrol_index,
            failed_plans: self.failed_plans,
            investigating: self.investigating,
        }
    }

    /// Advances the agent by `dt`.
    ///
    /// Dead agents ignore ticks. An inactive agent starts patrolling on its
    /// first tick.
    pub fn tick<S>(
        &mut self,
        dt: Duration,
        grid: &NavGrid,
        senses: &S,
        out: &mut Vec<PursuitEvent>,
    ) where
        S: Senses + ?Sized,
    {
        if self.health <= 0.0 {
            self.die(out);
        }
        if self.mode.is_terminal() {
            return;
        }
        if self.mode == AgentMode::Inactive {
            self.transition(AgentMode::Patrolling, out);
        }

        if !self.frozen.is_zero() {
            self.frozen = self.frozen.saturating_sub(dt);
            return;
        }
        if self.check_stall(dt, out) {
            return;
        }

        match self.mode {
            AgentMode::Patrolling => self.patrol(dt, grid, senses, out),
            AgentMode::Chasing => self.chase(dt, grid, senses, out),
            AgentMode::Attacking => self.attack(dt, grid, senses, out),
            AgentMode::Inactive | AgentMode::Dead => {}
        }
    }

    /// Replaces the current path with a fresh route to `goal`.
    ///
    /// On failure the agent drops its path and holds position; the failure is
    /// also reported as [`PursuitEvent::PathNotFound`]. Dead agents ignore the
    /// request.
    pub fn request_path(
        &mut self,
        goal: Vec3,
        grid: &NavGrid,
        out: &mut Vec<PursuitEvent>,
    ) -> Result<(), PlanError> {
        if self.mode.is_terminal() {
            return Ok(());
        }

        self.since_replan = Duration::ZERO;
        self.cursor = 0;
        match self.planner.find_path(grid, self.position, goal) {
            Ok(path) => {
                out.push(PursuitEvent::PathPlanned {
                    agent: self.id,
                    goal,
                    waypoints: path.len(),
                });
                self.path = path;
                Ok(())
            }
            Err(error) => {
                self.path = Path::empty();
                self.failed_plans += 1;
                warn!(agent = %self.id, %goal, %error, "no route, holding position");
                out.push(PursuitEvent::PathNotFound {
                    agent: self.id,
                    goal,
                    error,
                });
                Err(error)
            }
        }
    }

    /// Subtracts `amount` from the agent's health, killing it at zero.
    ///
    /// Negative amounts are ignored. Death fires exactly once.
    pub fn apply_damage(&mut self, amount: f32, out: &mut Vec<PursuitEvent>) {
        if self.has_died {
            return;
        }
        self.health -= amount.max(0.0);
        if self.health <= 0.0 {
            self.die(out);
        }
    }

    fn patrol<S>(
        &mut self,
        dt: Duration,
        grid: &NavGrid,
        senses: &S,
        out: &mut Vec<PursuitEvent>,
    ) where
        S: Senses + ?Sized,
    {
        if let Some(target) = self.sensed_target(grid, senses) {
            self.last_known = Some(target);
            self.transition(AgentMode::Chasing, out);
            let _ = self.request_path(target, grid, out);
            return;
        }

        if self.path_finished() {
            if !self.patrol_retry.is_zero() {
                self.patrol_retry = self.patrol_retry.saturating_sub(dt);
                return;
            }
            let goal = self.patrol_points[self.patrol_index];
            if planar_distance(self.position, goal) < self.follower.arrival_tolerance() {
                self.advance_patrol_index();
                return;
            }
            if self.request_path(goal, grid, out).is_err() {
                self.patrol_retry = self.profile.replan_interval;
                self.advance_patrol_index();
                return;
            }
        }

        if self.follow(self.profile.patrol_speed, dt) {
            self.path = Path::empty();
            self.cursor = 0;
            self.advance_patrol_index();
        }
    }

    fn chase<S>(
        &mut self,
        dt: Duration,
        grid: &NavGrid,
        senses: &S,
        out: &mut Vec<PursuitEvent>,
    ) where
        S: Senses + ?Sized,
    {
        let Some(target) = self.sensed_target(grid, senses) else {
            if self.investigating.is_some() {
                self.investigate(dt, grid, out);
            } else {
                self.lose_target(grid, out);
            }
            return;
        };
        self.last_known = Some(target);

        self.since_replan += dt;
        if self.investigating.take().is_some()
            || self.since_replan >= self.profile.replan_interval
        {
            let _ = self.request_path(target, grid, out);
        }

        if planar_distance(self.position, target) <= self.profile.attack_radius {
            self.transition(AgentMode::Attacking, out);
            self.since_attack = Duration::ZERO;
            self.launch_attack(target, out);
            return;
        }

        self.close_in(target, grid, dt);
    }

    /// Follows the planned route, then walks straight at the target once the
    /// agent stands in the target's cell or the route has ended there.
    fn close_in(&mut self, target: Vec3, grid: &NavGrid, dt: Duration) {
        let speed = self.profile.chase_speed;
        let goal_cell = grid.index_of(target);
        let here = grid.index_of(self.position);
        let route_end = self.path.last().and_then(|end| grid.index_of(end));
        let route_ends_there = self.path_finished() && route_end == goal_cell;

        if goal_cell.is_some() && (here == goal_cell || route_ends_there) {
            self.position = self.follower.approach(self.position, target, speed, dt);
        } else {
            let _ = self.follow(speed, dt);
        }
    }

    /// Handles a target that just dropped out of perception.
    fn lose_target(&mut self, grid: &NavGrid, out: &mut Vec<PursuitEvent>) {
        let spot = self
            .last_known
            .take()
            .filter(|_| self.profile.investigate_last_known);
        let Some(spot) = spot else {
            self.resume_patrol(grid, out);
            return;
        };

        self.transition(AgentMode::Chasing, out);
        if self.request_path(spot, grid, out).is_ok() {
            self.investigating = Some(spot);
        } else {
            self.resume_patrol(grid, out);
        }
    }

    fn investigate(&mut self, dt: Duration, grid: &NavGrid, out: &mut Vec<PursuitEvent>) {
        if self.follow(self.profile.chase_speed, dt) || self.path_finished() {
            self.resume_patrol(grid, out);
        }
    }

    fn attack<S>(
        &mut self,
        dt: Duration,
        grid: &NavGrid,
        senses: &S,
        out: &mut Vec<PursuitEvent>,
    ) where
        S: Senses + ?Sized,
    {
        let Some(target) = self.sensed_target(grid, senses) else {
            self.lose_target(grid, out);
            return;
        };
        self.last_known = Some(target);

        if planar_distance(self.position, target) > self.profile.attack_radius {
            match self.profile.attack_recovery {
                AttackRecovery::Chase => {
                    self.transition(AgentMode::Chasing, out);
                    let _ = self.request_path(target, grid, out);
                }
                AttackRecovery::Patrol => self.resume_patrol(grid, out),
            }
            return;
        }

        if let AttackPolicy::Cooldown { interval } = self.profile.attack_policy {
            self.since_attack += dt;
            if self.since_attack >= interval {
                self.since_attack = Duration::ZERO;
                self.launch_attack(target, out);
            }
        }
    }

    fn sensed_target<S>(&self, grid: &NavGrid, senses: &S) -> Option<Vec3>
    where
        S: Senses + ?Sized,
    {
        let target = senses.target_position()?;
        let query = SenseQuery {
            agent: self.position,
            target,
            detection_radius: self.profile.detection_radius,
        };
        senses.perceives(grid, &query).then_some(target)
    }

    fn resume_patrol(&mut self, grid: &NavGrid, out: &mut Vec<PursuitEvent>) {
        self.transition(AgentMode::Patrolling, out);
        self.last_known = None;
        self.investigating = None;
        self.advance_patrol_index();
        self.patrol_retry = Duration::ZERO;
        let goal = self.patrol_points[self.patrol_index];
        if self.request_path(goal, grid, out).is_err() {
            self.patrol_retry = self.profile.replan_interval;
            self.advance_patrol_index();
        }
    }

    fn follow(&mut self, speed: f32, dt: Duration) -> bool {
        if self.path.is_empty() {
            return false;
        }
        let step = self
            .follower
            .advance(&self.path, self.cursor, self.position, speed, dt);
        self.position = step.position;
        self.cursor = step.cursor;
        step.finished
    }

    fn path_finished(&self) -> bool {
        self.cursor >= self.path.len()
    }

    fn advance_patrol_index(&mut self) {
        self.patrol_index = (self.patrol_index + 1) % self.patrol_points.len();
    }

    fn launch_attack(&mut self, target: Vec3, out: &mut Vec<PursuitEvent>) {
        info!(agent = %self.id, %target, "attack launched");
        out.push(PursuitEvent::AttackLaunched {
            agent: self.id,
            target,
        });
    }

    fn check_stall(&mut self, dt: Duration, out: &mut Vec<PursuitEvent>) -> bool {
        let Some(recovery) = self.profile.stall_recovery else {
            return false;
        };
        let Some(monitor) = self.stall.as_mut() else {
            return false;
        };

        let moving = matches!(self.mode, AgentMode::Patrolling | AgentMode::Chasing);
        if !moving {
            monitor.reset(self.position);
            return false;
        }
        if !monitor.observe(self.position, dt) {
            return false;
        }

        let index = self.rng.gen_range(0..self.patrol_points.len());
        let point = self.patrol_points[index];
        let from = self.position;
        let to = Vec3::new(point.x, from.y, point.z);
        monitor.reset(to);

        self.position = to;
        self.path = Path::empty();
        self.cursor = 0;
        self.patrol_index = index;
        self.patrol_retry = Duration::ZERO;
        self.since_replan = self.profile.replan_interval;
        self.frozen = recovery.freeze;

        info!(agent = %self.id, %from, %to, "stalled, teleported to patrol point");
        out.push(PursuitEvent::Teleported {
            agent: self.id,
            from,
            to,
        });
        true
    }

    fn die(&mut self, out: &mut Vec<PursuitEvent>) {
        if self.has_died {
            return;
        }
        self.has_died = true;
        self.path = Path::empty();
        self.cursor = 0;
        self.transition(AgentMode::Dead, out);
        info!(agent = %self.id, position = %self.position, "died");
        out.push(PursuitEvent::Died {
            agent: self.id,
            position: self.position,
        });
    }

    fn transition(&mut self, to: AgentMode, out: &mut Vec<PursuitEvent>) {
        let from = self.mode;
        if from == to || from.is_terminal() {
            return;
        }
        self.mode = to;
        info!(agent = %self.id, %from, %to, "state changed");
        out.push(PursuitEvent::StateChanged {
            agent: self.id,
            from,
            to,
        });
    }
}
