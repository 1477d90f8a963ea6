//! Challenge settings and tunables
//!
//! Loaded from JSON; every field falls back to the reference value.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::Result;

/// What happens when the countdown reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutBehavior {
    /// Pause the simulation in the `TimeUp` phase
    #[default]
    Pause,
    /// Keep running; the display stays at 00:00
    Continue,
}

/// Rescue challenge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RescueSettings {
    // === Timing ===
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Countdown length in seconds
    pub start_time_secs: u32,
    pub timeout: TimeoutBehavior,

    // === Geometry ===
    /// World units per tile
    pub tile_length: f32,
    pub follow_point_radius: f32,
    pub robot_centre_radius: f32,

    // === Rules ===
    pub touch_penalty: i64,
    pub max_touch_penalty: i64,
    /// Allowed distance from the current target before the run is paused
    pub max_follow_dist: f32,

    // === Debug visuals ===
    /// Write waypoint fills to the HUD
    pub show_follow_points: bool,

    // === HUD layout (world space) ===
    /// Top-left of the first tile summary widget
    pub summary_origin: Vec2,
    /// Vertical gap between summary widgets
    pub summary_spacing: f32,
    pub reset_button_position: Vec2,
    pub reset_button_radius: f32,
}

impl Default for RescueSettings {
    fn default() -> Self {
        Self {
            tick_rate: GAME_TICK_RATE,
            start_time_secs: START_TIME_SECS,
            timeout: TimeoutBehavior::Pause,

            tile_length: TILE_LENGTH,
            follow_point_radius: FOLLOW_POINT_RADIUS,
            robot_centre_radius: ROBOT_CENTRE_RADIUS,

            touch_penalty: TOUCH_PENALTY,
            max_touch_penalty: MAX_TOUCH_PENALTY,
            max_follow_dist: MAX_FOLLOW_DIST,

            show_follow_points: true,

            summary_origin: Vec2::new(-140.0, 80.0),
            summary_spacing: 4.0,
            reset_button_position: Vec2::new(-130.0, -80.0),
            reset_button_radius: 6.0,
        }
    }
}

impl RescueSettings {
    /// Parse settings from JSON (missing fields use defaults)
    pub fn from_json(json: &str) -> Result<Self> {
        let settings = serde_json::from_str(json)?;
        log::info!("Loaded rescue settings");
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Squared lack-of-progress threshold
    pub fn max_follow_dist_sq(&self) -> f32 {
        self.max_follow_dist * self.max_follow_dist
    }
}
