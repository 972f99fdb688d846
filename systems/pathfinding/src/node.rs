//! Transient planning records.

use glam::Vec3;
use maze_haunt_core::CellIndex;

/// Position of a [`SearchNode`] inside the planner's node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(value: usize) -> Self {
        Self(value)
    }

    /// Offset of the node within the arena.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Cost bookkeeping for one grid cell during a single planning call.
///
/// `parent` links back toward the start and is only followed to rebuild the
/// finished route. Nodes are discarded when the call returns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchNode {
    cell: CellIndex,
    position: Vec3,
    g: f32,
    h: f32,
    parent: Option<NodeId>,
}

impl SearchNode {
    pub(crate) fn new(
        cell: CellIndex,
        position: Vec3,
        g: f32,
        h: f32,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            cell,
            position,
            g,
            h,
            parent,
        }
    }

    /// Grid cell the node stands for.
    #[must_use]
    pub const fn cell(&self) -> CellIndex {
        self.cell
    }

    /// Centre of the node's cell.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Cost accumulated from the start.
    #[must_use]
    pub const fn g(&self) -> f32 {
        self.g
    }

    /// Heuristic estimate of the remaining cost to the goal.
    #[must_use]
    pub const fn h(&self) -> f32 {
        self.h
    }

    /// Estimated total cost through this node.
    #[must_use]
    pub fn f(&self) -> f32 {
        self.g + self.h
    }

    /// Node this one was reached from, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn relink(&mut self, parent: NodeId, g: f32, h: f32) {
        self.parent = Some(parent);
        self.g = g;
        self.h = h;
    }

    pub(crate) fn take_parent(&mut self) -> Option<NodeId> {
        self.parent.take()
    }
}
