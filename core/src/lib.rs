#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Maze Haunt pursuit engine.
//!
//! This crate defines the value types that connect the navigation grid, the
//! planner, the movement helpers and the pursuit state machine. Hosts build a
//! grid from a [`GridSpec`], ask the planner for a [`Path`], and drive pursuers
//! whose observable side effects arrive as [`PursuitEvent`] values. Expected
//! planning failures are described by [`PlanError`] rather than panics.

use std::{collections::BTreeMap, fmt, time::Duration};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vertical offset above a cell centre handed to obstacle queries by default.
pub const DEFAULT_PROBE_HEIGHT: f32 = 10.0;

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Row-major offset of a cell inside its grid (`row * columns + column`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex(usize);

impl CellIndex {
    /// Wraps a raw row-major offset.
    #[must_use]
    pub const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Retrieves the raw row-major offset.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Geometry of a navigation grid laid over the ground plane.
///
/// Rows advance along the world `z` axis and columns along `x`. The `y`
/// component of `origin` is the height of every cell centre.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of cell rows.
    pub rows: u32,
    /// Number of cell columns.
    pub columns: u32,
    /// Edge length of a square cell in world units.
    pub cell_size: f32,
    /// World position of the grid's minimum corner.
    pub origin: Vec3,
    /// Height above each cell centre at which obstacles are probed.
    #[serde(default = "default_probe_height")]
    pub probe_height: f32,
    /// Whether planning may step to the four diagonal neighbours.
    #[serde(default = "default_allow_diagonal")]
    pub allow_diagonal: bool,
}

impl GridSpec {
    /// Creates a grid description with the default probe height and diagonal moves enabled.
    #[must_use]
    pub const fn new(rows: u32, columns: u32, cell_size: f32, origin: Vec3) -> Self {
        Self {
            rows,
            columns,
            cell_size,
            origin,
            probe_height: DEFAULT_PROBE_HEIGHT,
            allow_diagonal: true,
        }
    }

    /// Returns a copy restricted to orthogonal or eight-way movement.
    #[must_use]
    pub const fn with_diagonal(mut self, allow_diagonal: bool) -> Self {
        self.allow_diagonal = allow_diagonal;
        self
    }

    /// Returns a copy that probes obstacles at the provided height.
    #[must_use]
    pub const fn with_probe_height(mut self, probe_height: f32) -> Self {
        self.probe_height = probe_height;
        self
    }

    /// Total number of cells covered by the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.rows) * u64::from(self.columns);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Extent of the grid along the world `x` axis.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_size
    }

    /// Extent of the grid along the world `z` axis.
    #[must_use]
    pub fn depth(&self) -> f32 {
        self.rows as f32 * self.cell_size
    }
}

fn default_probe_height() -> f32 {
    DEFAULT_PROBE_HEIGHT
}

fn default_allow_diagonal() -> bool {
    true
}

/// Ordered world-space waypoints produced by a single planning call.
///
/// A path is never edited in place; replanning replaces it wholesale.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    waypoints: Vec<Vec3>,
}

impl Path {
    /// Creates a path visiting the provided waypoints in order.
    #[must_use]
    pub fn from_waypoints(waypoints: Vec<Vec3>) -> Self {
        Self { waypoints }
    }

    /// Creates a path without waypoints.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            waypoints: Vec::new(),
        }
    }

    /// Waypoints in travel order.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the path has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoint stored at the provided position, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.waypoints.get(index).copied()
    }

    /// First waypoint (the start cell's centre for planned paths).
    #[must_use]
    pub fn first(&self) -> Option<Vec3> {
        self.waypoints.first().copied()
    }

    /// Last waypoint (the goal cell's centre for planned paths).
    #[must_use]
    pub fn last(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }

    /// Sum of the straight segment lengths between consecutive waypoints.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum()
    }
}

/// Which end of a planning request failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// The position the search starts from.
    Start,
    /// The position the search attempts to reach.
    Goal,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Goal => write!(f, "goal"),
        }
    }
}

/// Expected reasons a route cannot be produced.
///
/// Every variant is a routine gameplay outcome; pursuers hold position and
/// retry rather than treating any of them as a fault.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanError {
    /// A queried position lies outside the grid extent.
    #[error("{endpoint} position lies outside the navigation grid")]
    OutOfBounds {
        /// Endpoint that fell outside the grid.
        endpoint: Endpoint,
    },
    /// The goal position resolves to an obstacle cell.
    #[error("goal cell is an obstacle")]
    InvalidGoal,
    /// The search exhausted its frontier without reaching the goal.
    #[error("no path connects the start and goal cells")]
    NoPathFound,
}

/// Unique identifier assigned to a pursuing agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Logical state of a pursuing agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentMode {
    /// Constructed but not yet ticked.
    Inactive,
    /// Walking the round-robin patrol route.
    Patrolling,
    /// Following replanned routes toward a perceived target.
    Chasing,
    /// Within attack range of the target.
    Attacking,
    /// Terminal state; no further transitions.
    Dead,
}

impl AgentMode {
    /// Reports whether the mode admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dead)
    }

    /// Lower-case label used in logs and transcripts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Patrolling => "patrolling",
            Self::Chasing => "chasing",
            Self::Attacking => "attacking",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How often the attack side effect fires while an agent remains in range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPolicy {
    /// Fires exactly once each time the agent enters the attacking state.
    OncePerEntry,
    /// Fires on entry and again every `interval` while still attacking.
    Cooldown {
        /// Minimum simulated time between successive attacks.
        interval: Duration,
    },
}

/// Where an attacking agent goes once the target leaves attack range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackRecovery {
    /// Resume chasing while the target is still perceived.
    Chase,
    /// Give up and return to the patrol route.
    Patrol,
}

/// Observable outcomes reported by pursuers for the host to act upon.
#[derive(Clone, Debug, PartialEq)]
pub enum PursuitEvent {
    /// The agent moved between logical states.
    StateChanged {
        /// Agent that transitioned.
        agent: AgentId,
        /// State before the transition.
        from: AgentMode,
        /// State after the transition.
        to: AgentMode,
    },
    /// A new path replaced the agent's previous one.
    PathPlanned {
        /// Agent that requested the path.
        agent: AgentId,
        /// Requested destination in world space.
        goal: Vec3,
        /// Number of waypoints in the new path.
        waypoints: usize,
    },
    /// A planning request produced no route; the agent holds position.
    PathNotFound {
        /// Agent that requested the path.
        agent: AgentId,
        /// Requested destination in world space.
        goal: Vec3,
        /// Reason the planner gave up.
        error: PlanError,
    },
    /// The attack side effect fired.
    AttackLaunched {
        /// Attacking agent.
        agent: AgentId,
        /// Target position at the moment of the attack.
        target: Vec3,
    },
    /// The agent died; emitted exactly once.
    Died {
        /// Agent that died.
        agent: AgentId,
        /// Where the agent died.
        position: Vec3,
    },
    /// Stall recovery relocated the agent to a patrol point.
    Teleported {
        /// Agent that was relocated.
        agent: AgentId,
        /// Position before the teleport.
        from: Vec3,
        /// Patrol point the agent now occupies.
        to: Vec3,
    },
}

impl PursuitEvent {
    /// Agent the event concerns.
    #[must_use]
    pub const fn agent(&self) -> AgentId {
        match self {
            Self::StateChanged { agent, .. }
            | Self::PathPlanned { agent, .. }
            | Self::PathNotFound { agent, .. }
            | Self::AttackLaunched { agent, .. }
            | Self::Died { agent, .. }
            | Self::Teleported { agent, .. } => *agent,
        }
    }
}

/// Collectible item categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// Standard key that opens ordinary locked doors.
    Key,
    /// Green key that opens the green gate.
    GreenKey,
}

impl ItemKind {
    /// Every item kind in declaration order.
    pub const ALL: [ItemKind; 2] = [ItemKind::Key, ItemKind::GreenKey];
}

/// Per-kind counts of collected items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    counts: BTreeMap<ItemKind, u32>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more item of the provided kind and returns the new count.
    pub fn add(&mut self, kind: ItemKind) -> u32 {
        let count = self.counts.entry(kind).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Number of items of the provided kind collected so far.
    #[must_use]
    pub fn count(&self, kind: ItemKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Reports whether at least one item of the provided kind was collected.
    #[must_use]
    pub fn contains(&self, kind: ItemKind) -> bool {
        self.count(kind) > 0
    }
}
