//! Sensor collisions for waypoint tracking
//!
//! The physics layer is external; the engine only talks to it through
//! [`SensorWorld`]. Waypoints and robot followers are circular sensors in
//! their own collision categories so they never touch scenery, only each
//! other. [`SensorSpace`] is a small in-crate implementation used by the
//! headless driver and the tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::follow::{FollowAddress, FollowPointGraph};
use crate::consts::*;
use crate::error::{RescueError, Result};

/// Opaque handle to a sensor owned by the physics layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorHandle(pub u32);

/// Category/mask pair; two sensors interact only if each one's mask covers the other's category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub categories: u32,
    pub mask: u32,
}

impl CollisionFilter {
    pub const FOLLOW_POINT: Self = Self {
        categories: FOLLOW_POINT_CATEGORY,
        mask: ROBOT_FOLLOW_CATEGORY,
    };
    pub const ROBOT_FOLLOWER: Self = Self {
        categories: ROBOT_FOLLOW_CATEGORY,
        mask: FOLLOW_POINT_CATEGORY,
    };
    /// Clickable UI geometry: only found by point queries
    pub const INTERACTIVE: Self = Self {
        categories: INTERACTIVE_CATEGORY,
        mask: 0,
    };

    #[inline]
    pub fn interacts(&self, other: &CollisionFilter) -> bool {
        self.categories & other.mask != 0 && other.categories & self.mask != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    Static,
    Dynamic,
}

/// A circular sensor to register with the physics layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorDesc {
    pub position: Vec2,
    pub radius: f32,
    pub filter: CollisionFilter,
    pub collision_type: u32,
    pub kind: BodyKind,
}

/// A begin-contact between two sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub a: SensorHandle,
    pub b: SensorHandle,
}

/// Boundary to the physics layer
pub trait SensorWorld {
    fn add_sensor(&mut self, desc: SensorDesc) -> SensorHandle;
    fn remove_sensor(&mut self, handle: SensorHandle);
    fn set_position(&mut self, handle: SensorHandle, position: Vec2);
    /// Drop any ongoing contacts of `handle` so the next step reports them as new
    fn forget_contacts(&mut self, handle: SensorHandle);
    fn position(&self, handle: SensorHandle) -> Option<Vec2>;
    /// Sensors in any of `categories` whose volume contains `point`
    fn point_query(&self, point: Vec2, categories: u32) -> Vec<SensorHandle>;
}

/// Minimal circle-sensor world with begin-contact events
#[derive(Debug, Clone, Default)]
pub struct SensorSpace {
    next_id: u32,
    sensors: BTreeMap<SensorHandle, SensorDesc>,
    /// Pairs overlapping as of the last step (lower handle first)
    touching: BTreeSet<(SensorHandle, SensorHandle)>,
}

impl SensorSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn get(&self, handle: SensorHandle) -> Option<&SensorDesc> {
        self.sensors.get(&handle)
    }

    /// Detect overlaps and return the pairs that started touching since the last step
    pub fn step(&mut self) -> Vec<Contact> {
        let sensors: Vec<_> = self.sensors.iter().map(|(h, d)| (*h, *d)).collect();
        let mut now = BTreeSet::new();
        let mut began = Vec::new();

        for (i, (ha, a)) in sensors.iter().enumerate() {
            for (hb, b) in &sensors[i + 1..] {
                if a.kind == BodyKind::Static && b.kind == BodyKind::Static {
                    continue;
                }
                if !a.filter.interacts(&b.filter) {
                    continue;
                }
                let reach = a.radius + b.radius;
                if a.position.distance_squared(b.position) > reach * reach {
                    continue;
                }
                let pair = (*ha, *hb);
                if !self.touching.contains(&pair) {
                    began.push(Contact { a: *ha, b: *hb });
                }
                now.insert(pair);
            }
        }

        self.touching = now;
        began
    }
}

impl SensorWorld for SensorSpace {
    fn add_sensor(&mut self, desc: SensorDesc) -> SensorHandle {
        let handle = SensorHandle(self.next_id);
        self.next_id += 1;
        self.sensors.insert(handle, desc);
        handle
    }

    fn remove_sensor(&mut self, handle: SensorHandle) {
        self.sensors.remove(&handle);
        self.forget_contacts(handle);
    }

    fn set_position(&mut self, handle: SensorHandle, position: Vec2) {
        if let Some(desc) = self.sensors.get_mut(&handle) {
            desc.position = position;
        }
    }

    fn forget_contacts(&mut self, handle: SensorHandle) {
        self.touching.retain(|(a, b)| *a != handle && *b != handle);
    }

    fn position(&self, handle: SensorHandle) -> Option<Vec2> {
        self.sensors.get(&handle).map(|d| d.position)
    }

    fn point_query(&self, point: Vec2, categories: u32) -> Vec<SensorHandle> {
        self.sensors
            .iter()
            .filter(|(_, d)| d.filter.categories & categories != 0)
            .filter(|(_, d)| d.position.distance_squared(point) <= d.radius * d.radius)
            .map(|(h, _)| *h)
            .collect()
    }
}

/// What an engine-owned sensor stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorTag {
    FollowPoint(FollowAddress),
    /// Index of the robot the follower tracks
    RobotFollower(usize),
}

/// Registers waypoint and follower sensors and routes contacts to addresses
#[derive(Debug, Clone, Default)]
pub struct CollisionDispatcher {
    tags: HashMap<SensorHandle, SensorTag>,
    follow_sensors: BTreeMap<FollowAddress, SensorHandle>,
    followers: Vec<SensorHandle>,
}

impl CollisionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// One static sensor per waypoint of `graph`
    pub fn register_graph<W: SensorWorld + ?Sized>(
        &mut self,
        world: &mut W,
        graph: &FollowPointGraph,
        radius: f32,
    ) {
        for (address, position) in graph.addresses() {
            let handle = world.add_sensor(SensorDesc {
                position,
                radius,
                filter: CollisionFilter::FOLLOW_POINT,
                collision_type: FOLLOW_POINT_COLLISION_TYPE,
                kind: BodyKind::Static,
            });
            self.tags.insert(handle, SensorTag::FollowPoint(address));
            self.follow_sensors.insert(address, handle);
        }
        log::debug!(
            "Tile {}: registered {} follow point sensors",
            graph.tile_index(),
            graph.point_count()
        );
    }

    /// Dynamic follower sensor for the next robot index
    pub fn register_robot<W: SensorWorld + ?Sized>(
        &mut self,
        world: &mut W,
        position: Vec2,
        radius: f32,
    ) -> SensorHandle {
        let robot = self.followers.len();
        let handle = world.add_sensor(SensorDesc {
            position,
            radius,
            filter: CollisionFilter::ROBOT_FOLLOWER,
            collision_type: ROBOT_CENTRE_COLLISION_TYPE,
            kind: BodyKind::Dynamic,
        });
        self.tags.insert(handle, SensorTag::RobotFollower(robot));
        self.followers.push(handle);
        handle
    }

    pub fn tag(&self, handle: SensorHandle) -> Option<SensorTag> {
        self.tags.get(&handle).copied()
    }

    pub fn follower(&self, robot: usize) -> Option<SensorHandle> {
        self.followers.get(robot).copied()
    }

    pub fn follow_sensor(&self, address: FollowAddress) -> Option<SensorHandle> {
        self.follow_sensors.get(&address).copied()
    }

    /// Resolve a contact to `(waypoint, robot)`.
    ///
    /// Anything but exactly one waypoint and one follower is an invariant violation.
    pub fn resolve(&self, a: SensorHandle, b: SensorHandle) -> Result<(FollowAddress, usize)> {
        let (first, second) = (self.tag(a), self.tag(b));
        match (first, second) {
            (Some(SensorTag::FollowPoint(address)), Some(SensorTag::RobotFollower(robot)))
            | (Some(SensorTag::RobotFollower(robot)), Some(SensorTag::FollowPoint(address))) => {
                Ok((address, robot))
            }
            _ => Err(RescueError::InvalidContact { first, second }),
        }
    }

    /// Remove every registered sensor from the world
    pub fn teardown<W: SensorWorld + ?Sized>(&mut self, world: &mut W) {
        let count = self.tags.len();
        for handle in self.tags.keys() {
            world.remove_sensor(*handle);
        }
        self.tags.clear();
        self.follow_sensors.clear();
        self.followers.clear();
        log::debug!("Removed {count} rescue sensors");
    }
}
