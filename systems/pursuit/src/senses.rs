//! Host-supplied perception.

use glam::Vec3;
use maze_haunt_system_movement::planar_distance;
use maze_haunt_world::NavGrid;

/// Everything a sensing predicate may consider for one agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SenseQuery {
    /// Where the perceiving agent stands.
    pub agent: Vec3,
    /// Live position of the target.
    pub target: Vec3,
    /// The agent's detection range.
    pub detection_radius: f32,
}

/// Perception capability injected by the host.
pub trait Senses {
    /// Live position of the chased entity, or `None` when there is none.
    fn target_position(&self) -> Option<Vec3>;

    /// Reports whether the agent described by `query` currently perceives its target.
    fn perceives(&self, grid: &NavGrid, query: &SenseQuery) -> bool;
}

/// Axis-aligned region on the ground plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MazeBounds {
    min_x: f32,
    min_z: f32,
    max_x: f32,
    max_z: f32,
}

impl MazeBounds {
    /// Creates bounds spanning both corners, in any order.
    #[must_use]
    pub fn new(corner_a: Vec3, corner_b: Vec3) -> Self {
        Self {
            min_x: corner_a.x.min(corner_b.x),
            min_z: corner_a.z.min(corner_b.z),
            max_x: corner_a.x.max(corner_b.x),
            max_z: corner_a.z.max(corner_b.z),
        }
    }

    /// Reports whether `position` lies inside, edges included.
    #[must_use]
    pub fn contains(&self, position: Vec3) -> bool {
        (self.min_x..=self.max_x).contains(&position.x)
            && (self.min_z..=self.max_z).contains(&position.z)
    }
}

/// Range check plus grid reachability.
///
/// The target is perceived when it is within the detection radius on the
/// ground plane, inside the optional maze bounds, and standing on a walkable
/// cell of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RangeSenses {
    target: Option<Vec3>,
    bounds: Option<MazeBounds>,
}

impl RangeSenses {
    /// Creates senses with no target and no bounds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target: None,
            bounds: None,
        }
    }

    /// Restricts perception to targets inside `bounds`.
    #[must_use]
    pub const fn with_bounds(mut self, bounds: MazeBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Updates the live target position.
    pub fn set_target(&mut self, target: Option<Vec3>) {
        self.target = target;
    }
}

impl Senses for RangeSenses {
    fn target_position(&self) -> Option<Vec3> {
        self.target
    }

    fn perceives(&self, grid: &NavGrid, query: &SenseQuery) -> bool {
        if planar_distance(query.agent, query.target) > query.detection_radius {
            return false;
        }
        if let Some(bounds) = &self.bounds {
            if !bounds.contains(query.target) {
                return false;
            }
        }
        grid.index_of(query.target).is_some_and(|index| grid.is_walkable(index))
    }
}
