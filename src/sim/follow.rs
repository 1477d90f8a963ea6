//! Per-tile waypoint ("follow point") graphs
//!
//! A tile's graph is an ordered list of entries. An entry is either a single
//! waypoint or a branch point holding several alternative paths. Entry order
//! is traversal order.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{RescueError, Result};
use crate::local_to_world;

/// Address of a waypoint: `(tile, entry)` or `(tile, entry, branch, point)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FollowAddress {
    Single { tile: usize, entry: usize },
    Multi { tile: usize, entry: usize, branch: usize, point: usize },
}

impl FollowAddress {
    pub fn tile(&self) -> usize {
        match *self {
            FollowAddress::Single { tile, .. } | FollowAddress::Multi { tile, .. } => tile,
        }
    }

    pub fn entry(&self) -> usize {
        match *self {
            FollowAddress::Single { entry, .. } | FollowAddress::Multi { entry, .. } => entry,
        }
    }

    /// Tuple length of the address (2 or 4)
    pub fn depth(&self) -> usize {
        match self {
            FollowAddress::Single { .. } => 2,
            FollowAddress::Multi { .. } => 4,
        }
    }

    /// Flat index tuple
    pub fn indexes(&self) -> Vec<usize> {
        match *self {
            FollowAddress::Single { tile, entry } => vec![tile, entry],
            FollowAddress::Multi { tile, entry, branch, point } => vec![tile, entry, branch, point],
        }
    }
}

impl fmt::Display for FollowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowAddress::Single { tile, entry } => write!(f, "({tile}, {entry})"),
            FollowAddress::Multi { tile, entry, branch, point } => {
                write!(f, "({tile}, {entry}, {branch}, {point})")
            }
        }
    }
}

/// One waypoint slot of a graph (world space)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FollowEntry {
    Single(Vec2),
    /// Alternative paths; each branch is an ordered list of points
    Multi(Vec<Vec<Vec2>>),
}

/// Raw document shape of an entry, before placement
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Point([f32; 2]),
    Branches(Vec<Vec<[f32; 2]>>),
}

/// Waypoint graph of one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowPointGraph {
    tile_index: usize,
    entries: Vec<FollowEntry>,
}

impl FollowPointGraph {
    /// Graph from already-placed entries
    pub fn new(tile_index: usize, entries: Vec<FollowEntry>) -> Self {
        Self { tile_index, entries }
    }

    /// Build from a tile document's raw follow-point list, placing every
    /// point with the tile's rotation (radians) and origin.
    pub fn from_config(
        tile_index: usize,
        raw: &[serde_yaml::Value],
        rotation: f32,
        origin: Vec2,
    ) -> Result<Self> {
        let malformed = |reason: String| RescueError::MalformedFollowPoints {
            tile: tile_index,
            reason,
        };
        let place = |p: [f32; 2]| local_to_world(Vec2::from(p), rotation, origin);

        let mut entries = Vec::with_capacity(raw.len());
        for (j, value) in raw.iter().enumerate() {
            let parsed: RawEntry = serde_yaml::from_value(value.clone()).map_err(|_| {
                malformed(format!("entry {j}: expected [x, y] or a list of branches of [x, y]"))
            })?;
            let entry = match parsed {
                RawEntry::Point(p) => FollowEntry::Single(place(p)),
                RawEntry::Branches(branches) => {
                    if branches.is_empty() {
                        return Err(malformed(format!("entry {j}: branch point has no branches")));
                    }
                    if let Some(k) = branches.iter().position(Vec::is_empty) {
                        return Err(malformed(format!("entry {j}: branch {k} is empty")));
                    }
                    FollowEntry::Multi(
                        branches
                            .into_iter()
                            .map(|branch| branch.into_iter().map(place).collect())
                            .collect(),
                    )
                }
            };
            entries.push(entry);
        }

        Ok(Self { tile_index, entries })
    }

    pub fn tile_index(&self) -> usize {
        self.tile_index
    }

    pub fn entries(&self) -> &[FollowEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// World position at an address (None if it is not part of this graph)
    pub fn point(&self, address: FollowAddress) -> Option<Vec2> {
        if address.tile() != self.tile_index {
            return None;
        }
        match (self.entries.get(address.entry())?, address) {
            (FollowEntry::Single(p), FollowAddress::Single { .. }) => Some(*p),
            (FollowEntry::Multi(branches), FollowAddress::Multi { branch, point, .. }) => {
                branches.get(branch)?.get(point).copied()
            }
            _ => None,
        }
    }

    /// Every waypoint in traversal order (branches in order within a branch point)
    pub fn addresses(&self) -> Vec<(FollowAddress, Vec2)> {
        let tile = self.tile_index;
        let mut out = Vec::new();
        for (entry, slot) in self.entries.iter().enumerate() {
            match slot {
                FollowEntry::Single(p) => out.push((FollowAddress::Single { tile, entry }, *p)),
                FollowEntry::Multi(branches) => {
                    for (branch, points) in branches.iter().enumerate() {
                        for (point, p) in points.iter().enumerate() {
                            out.push((FollowAddress::Multi { tile, entry, branch, point }, *p));
                        }
                    }
                }
            }
        }
        out
    }

    /// The waypoint a robot spawns on
    pub fn first_point(&self) -> Option<(FollowAddress, Vec2)> {
        self.addresses().into_iter().next()
    }

    pub fn point_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match e {
                FollowEntry::Single(_) => 1,
                FollowEntry::Multi(branches) => branches.iter().map(Vec::len).sum(),
            })
            .sum()
    }
}
