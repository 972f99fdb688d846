#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic A* planner over the navigation grid.
//!
//! Step and heuristic costs are both the Euclidean distance between cell
//! centres. The open set is a [`PriorityFrontier`] ordered by ascending `f`
//! with ties resolved by insertion order, so identical requests on an
//! identical grid always yield identical waypoints.

pub mod frontier;
pub mod node;

use glam::Vec3;
use maze_haunt_core::{CellIndex, Endpoint, Path, PlanError};
use maze_haunt_world::NavGrid;
use tracing::{debug, trace};

pub use frontier::PriorityFrontier;
pub use node::{NodeId, SearchNode};

/// Counters describing the most recent planning call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlannerStats {
    /// Nodes moved from the frontier into the closed set.
    pub expanded: usize,
    /// Nodes created for newly discovered cells.
    pub discovered: usize,
}

/// A* planner that reuses its scratch buffers between calls.
///
/// Nothing carries over from one call to the next except allocations; each
/// call starts from an empty frontier and closed set.
#[derive(Debug, Default)]
pub struct PathPlanner {
    nodes: Vec<SearchNode>,
    node_of_cell: Vec<Option<NodeId>>,
    closed: Vec<bool>,
    frontier: PriorityFrontier,
    stats: PlannerStats,
}

impl PathPlanner {
    /// Creates a planner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters gathered during the most recent call to [`Self::find_path`].
    #[must_use]
    pub const fn last_stats(&self) -> PlannerStats {
        self.stats
    }

    /// Computes the least-cost route between two world positions.
    ///
    /// On success the first waypoint is the start cell's centre and the last
    /// is the goal cell's centre; when both resolve to the same cell the path
    /// holds only that centre. Diagonal steps follow the grid's
    /// `allow_diagonal` setting.
    pub fn find_path(
        &mut self,
        grid: &NavGrid,
        start: Vec3,
        goal: Vec3,
    ) -> Result<Path, PlanError> {
        self.stats = PlannerStats::default();

        let start_cell = grid.index_of(start).ok_or(PlanError::OutOfBounds {
            endpoint: Endpoint::Start,
        })?;
        let goal_cell = grid.index_of(goal).ok_or(PlanError::OutOfBounds {
            endpoint: Endpoint::Goal,
        })?;
        if !grid.is_walkable(goal_cell) {
            return Err(PlanError::InvalidGoal);
        }

        let goal_center = center(grid, goal_cell)?;
        if start_cell == goal_cell {
            return Ok(Path::from_waypoints(vec![goal_center]));
        }

        self.reset(grid.len());
        let start_center = center(grid, start_cell)?;
        let _ = self.discover(
            start_cell,
            start_center,
            0.0,
            start_center.distance(goal_center),
            None,
        );

        while let Some(current_id) = self.frontier.pop_best() {
            let current = self.nodes[current_id.get()];
            if current.cell() == goal_cell {
                let path = self.reconstruct(current_id);
                debug!(
                    waypoints = path.len(),
                    expanded = self.stats.expanded,
                    discovered = self.stats.discovered,
                    "path planned"
                );
                return Ok(path);
            }

            self.closed[current.cell().get()] = true;
            self.stats.expanded += 1;

            for neighbor in grid.neighbors(current.cell(), grid.allows_diagonal()) {
                if self.closed[neighbor.get()] {
                    continue;
                }

                let position = center(grid, neighbor)?;
                let tentative = current.g() + position.distance(current.position());
                let heuristic = position.distance(goal_center);

                match self.node_of_cell[neighbor.get()] {
                    None => {
                        let _ = self.discover(
                            neighbor,
                            position,
                            tentative,
                            heuristic,
                            Some(current_id),
                        );
                    }
                    Some(existing_id) => {
                        let existing = &mut self.nodes[existing_id.get()];
                        if tentative < existing.g() {
                            existing.relink(current_id, tentative, heuristic);
                            let priority = existing.f();
                            let _ = self.frontier.reprioritize(existing_id, priority);
                        }
                    }
                }
            }
        }

        trace!(
            expanded = self.stats.expanded,
            "frontier exhausted before reaching goal"
        );
        Err(PlanError::NoPathFound)
    }

    fn reset(&mut self, cell_count: usize) {
        self.nodes.clear();
        self.node_of_cell.clear();
        self.node_of_cell.resize(cell_count, None);
        self.closed.clear();
        self.closed.resize(cell_count, false);
        self.frontier.clear();
    }

    fn discover(
        &mut self,
        cell: CellIndex,
        position: Vec3,
        g: f32,
        h: f32,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        let node = SearchNode::new(cell, position, g, h, parent);
        self.frontier.insert(id, node.f());
        self.nodes.push(node);
        self.node_of_cell[cell.get()] = Some(id);
        self.stats.discovered += 1;
        id
    }

    fn reconstruct(&mut self, goal: NodeId) -> Path {
        let mut waypoints = Vec::new();
        let mut cursor = Some(goal);
        while let Some(id) = cursor {
            let node = &mut self.nodes[id.get()];
            waypoints.push(node.position());
            cursor = node.take_parent();
        }
        waypoints.reverse();
        Path::from_waypoints(waypoints)
    }
}

fn center(grid: &NavGrid, cell: CellIndex) -> Result<Vec3, PlanError> {
    grid.cell_center(cell).ok_or(PlanError::NoPathFound)
}
