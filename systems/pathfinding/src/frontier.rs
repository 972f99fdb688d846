//! Ordered open set used by the planner.

use std::cmp::Ordering;

use crate::node::NodeId;

#[derive(Clone, Copy, Debug)]
struct Entry {
    node: NodeId,
    priority: f32,
}

/// Open set kept sorted by ascending priority.
///
/// Ties keep insertion order: a new entry lands after every entry with an
/// equal or lower priority, and [`PriorityFrontier::reprioritize`] re-sorts
/// stably. The best element is always at the front.
#[derive(Clone, Debug, Default)]
pub struct PriorityFrontier {
    entries: Vec<Entry>,
}

impl PriorityFrontier {
    /// Creates an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no nodes are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every queued node.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Node with the lowest priority, without removing it.
    #[must_use]
    pub fn best(&self) -> Option<NodeId> {
        self.entries.first().map(|entry| entry.node)
    }

    /// Removes and returns the node with the lowest priority.
    pub fn pop_best(&mut self) -> Option<NodeId> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.remove(0).node)
    }

    /// Queues `node`, placing it after all entries of equal priority.
    pub fn insert(&mut self, node: NodeId, priority: f32) {
        let position = self
            .entries
            .partition_point(|entry| compare(entry.priority, priority) != Ordering::Greater);
        self.entries.insert(position, Entry { node, priority });
    }

    /// Reports whether `node` is queued.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.position_of(node).is_some()
    }

    /// Removes `node`, returning whether it was queued.
    pub fn remove(&mut self, node: NodeId) -> bool {
        match self.position_of(node) {
            Some(position) => {
                let _ = self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    /// Changes the priority of a queued node and restores the ordering.
    ///
    /// Returns `false` when the node is not queued.
    pub fn reprioritize(&mut self, node: NodeId, priority: f32) -> bool {
        let Some(position) = self.position_of(node) else {
            return false;
        };
        self.entries[position].priority = priority;
        self.resort();
        true
    }

    /// Stably re-sorts the queued nodes by priority.
    pub fn resort(&mut self) {
        self.entries
            .sort_by(|left, right| compare(left.priority, right.priority));
    }

    /// Queued nodes from best to worst.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|entry| entry.node)
    }

    fn position_of(&self, node: NodeId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.node == node)
    }
}

fn compare(left: f32, right: f32) -> Ordering {
    left.total_cmp(&right)
}
