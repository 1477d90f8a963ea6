//! Rescue Sim - rules engine for a rescue-line robotics challenge
//!
//! Core modules:
//! - `sim`: Deterministic core (waypoint graphs, completion, contacts, scoring, timer)
//! - `ui`: Write-only HUD sinks and pointer handling
//! - `config`: Challenge/tile documents and where they are loaded from
//! - `settings`: Tunable constants

pub mod config;
pub mod error;
pub mod settings;
pub mod sim;
pub mod ui;

pub use error::{RescueError, Result};
pub use settings::RescueSettings;

use glam::Vec2;

/// Reference values for the rescue preset
pub mod consts {
    /// Collision category of waypoint sensors
    pub const FOLLOW_POINT_CATEGORY: u32 = 0b1000;
    /// Collision category of robot follower sensors
    pub const ROBOT_FOLLOW_CATEGORY: u32 = 0b1_0000;
    /// Collision category of clickable static UI geometry (pointer hit-testing)
    pub const INTERACTIVE_CATEGORY: u32 = 0b0100;
    /// Collision category of ordinary world geometry
    pub const STATIC_CATEGORY: u32 = 0b0001;

    /// Collision type tag for waypoint sensors
    pub const FOLLOW_POINT_COLLISION_TYPE: u32 = 5;
    /// Collision type tag for robot follower sensors
    pub const ROBOT_CENTRE_COLLISION_TYPE: u32 = 6;

    /// Challenge length (seconds)
    pub const START_TIME_SECS: u32 = 5 * 60;
    /// Simulation tick rate (ticks per second)
    pub const GAME_TICK_RATE: u32 = 30;

    /// World units per tile
    pub const TILE_LENGTH: f32 = 30.0;

    /// Score penalty for a single touch
    pub const TOUCH_PENALTY: i64 = 5;
    /// Cap on the sum of all touch penalties
    pub const MAX_TOUCH_PENALTY: i64 = 20;

    /// Allowed drift from the current target before lack of progress
    pub const MAX_FOLLOW_DIST: f32 = 8.0;

    pub const FOLLOW_POINT_RADIUS: f32 = 1.0;
    pub const ROBOT_CENTRE_RADIUS: f32 = 3.0;
}

/// Convert degrees to radians
#[inline]
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Rotate `local` by `rotation` radians, then translate by `origin`
#[inline]
pub fn local_to_world(local: Vec2, rotation: f32, origin: Vec2) -> Vec2 {
    origin + Vec2::from_angle(rotation).rotate(local)
}
