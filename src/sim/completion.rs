//! Completion mirror of a follow-point graph
//!
//! Same shape as the graph, one bool per waypoint. A flag is only ever set by
//! a contact and only ever cleared by resetting the whole tile.

use serde::{Deserialize, Serialize};

use super::follow::{FollowAddress, FollowEntry, FollowPointGraph};

/// Completion flags for one graph entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionEntry {
    Single(bool),
    Multi(Vec<Vec<bool>>),
}

/// Completion state of one tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCompletion {
    tile_index: usize,
    entries: Vec<CompletionEntry>,
}

impl TileCompletion {
    /// All-false mirror of `graph`
    pub fn from_graph(graph: &FollowPointGraph) -> Self {
        let entries = graph
            .entries()
            .iter()
            .map(|e| match e {
                FollowEntry::Single(_) => CompletionEntry::Single(false),
                FollowEntry::Multi(branches) => {
                    CompletionEntry::Multi(branches.iter().map(|b| vec![false; b.len()]).collect())
                }
            })
            .collect();
        Self {
            tile_index: graph.tile_index(),
            entries,
        }
    }

    pub fn tile_index(&self) -> usize {
        self.tile_index
    }

    pub fn entries(&self) -> &[CompletionEntry] {
        &self.entries
    }

    /// Flag at `address`, None if the address is outside this tile's shape
    pub fn get(&self, address: FollowAddress) -> Option<bool> {
        if address.tile() != self.tile_index {
            return None;
        }
        match (self.entries.get(address.entry())?, address) {
            (CompletionEntry::Single(done), FollowAddress::Single { .. }) => Some(*done),
            (CompletionEntry::Multi(branches), FollowAddress::Multi { branch, point, .. }) => {
                branches.get(branch)?.get(point).copied()
            }
            _ => None,
        }
    }

    /// Set the flag at `address`.
    ///
    /// Returns `Some(true)` when the waypoint was newly completed, `Some(false)`
    /// when it already was, and `None` for an address outside the shape.
    pub fn mark(&mut self, address: FollowAddress) -> Option<bool> {
        if address.tile() != self.tile_index {
            return None;
        }
        let slot = match (self.entries.get_mut(address.entry())?, address) {
            (CompletionEntry::Single(done), FollowAddress::Single { .. }) => done,
            (CompletionEntry::Multi(branches), FollowAddress::Multi { branch, point, .. }) => {
                branches.get_mut(branch)?.get_mut(point)?
            }
            _ => return None,
        };
        let newly = !*slot;
        *slot = true;
        Some(newly)
    }

    /// Clear every flag (shape is untouched)
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            match entry {
                CompletionEntry::Single(done) => *done = false,
                CompletionEntry::Multi(branches) => {
                    branches.iter_mut().flatten().for_each(|done| *done = false)
                }
            }
        }
    }

    /// True if this mirror has exactly the shape of `graph`
    pub fn mirrors(&self, graph: &FollowPointGraph) -> bool {
        self.tile_index == graph.tile_index()
            && self.entries.len() == graph.entries().len()
            && self.entries.iter().zip(graph.entries()).all(|pair| match pair {
                (CompletionEntry::Single(_), FollowEntry::Single(_)) => true,
                (CompletionEntry::Multi(done), FollowEntry::Multi(points)) => {
                    done.len() == points.len()
                        && done.iter().zip(points).all(|(d, p)| d.len() == p.len())
                }
                _ => false,
            })
    }

    /// Number of completed waypoints
    pub fn completed_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match e {
                CompletionEntry::Single(done) => usize::from(*done),
                CompletionEntry::Multi(branches) => {
                    branches.iter().flatten().filter(|d| **d).count()
                }
            })
            .sum()
    }

    /// Every waypoint of every branch is complete
    pub fn all_complete(&self) -> bool {
        (0..self.entries.len()).all(|i| self.entry_complete_all(i))
    }

    /// Every entry is complete, where one finished branch completes a branch point
    pub fn all_complete_any_branch(&self) -> bool {
        (0..self.entries.len()).all(|i| self.entry_complete_any(i))
    }

    /// Entry complete with all branches required
    pub fn entry_complete_all(&self, entry: usize) -> bool {
        match self.entries.get(entry) {
            Some(CompletionEntry::Single(done)) => *done,
            Some(CompletionEntry::Multi(branches)) => branches.iter().flatten().all(|d| *d),
            None => false,
        }
    }

    /// Entry complete with any one full branch sufficing
    pub fn entry_complete_any(&self, entry: usize) -> bool {
        match self.entries.get(entry) {
            Some(CompletionEntry::Single(done)) => *done,
            Some(CompletionEntry::Multi(branches)) => {
                branches.iter().any(|b| b.iter().all(|d| *d))
            }
            None => false,
        }
    }

    /// Entry has at least one completed waypoint
    pub fn entry_touched(&self, entry: usize) -> bool {
        match self.entries.get(entry) {
            Some(CompletionEntry::Single(done)) => *done,
            Some(CompletionEntry::Multi(branches)) => branches.iter().flatten().any(|d| *d),
            None => false,
        }
    }
}
