//! HUD output and pointer handling
//!
//! The core only ever writes to the HUD. Whatever draws it implements
//! [`UiSink`]; [`HudRecorder`] keeps the latest values in memory.

pub mod pointer;

pub use pointer::{
    PointerButton, PointerEvent, PointerKind, ScreenToWorld, UiAction, UiControl, UiController,
    ViewportTransform,
};

use std::collections::BTreeMap;

use glam::Vec2;

use crate::sim::FollowAddress;

/// Fill of a waypoint not yet reached
pub const FOLLOW_POINT_FILL: &str = "#ff0000";
/// Fill of a completed waypoint
pub const COMPLETED_FILL: &str = "#00ff00";

/// Reset button icon state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetIcon {
    #[default]
    Idle,
    Pressed,
}

/// Placement of one tile's summary widget (world space)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSummaryLayout {
    pub tile_index: usize,
    /// Top-left corner
    pub position: Vec2,
    pub size: Vec2,
    /// Centre of the spawn control
    pub spawn_button: Vec2,
    pub spawn_radius: f32,
}

/// Write-only HUD targets
pub trait UiSink {
    fn set_timer_text(&mut self, text: &str);
    fn set_score_text(&mut self, text: &str);
    fn set_touches_text(&mut self, text: &str);
    fn set_touch_penalty_text(&mut self, text: &str);
    fn set_reset_icon(&mut self, icon: ResetIcon);
    fn set_follow_point_fill(&mut self, address: FollowAddress, fill: &str);
    fn set_tile_summary(&mut self, layout: &TileSummaryLayout);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUi;

impl UiSink for NullUi {
    fn set_timer_text(&mut self, _text: &str) {}
    fn set_score_text(&mut self, _text: &str) {}
    fn set_touches_text(&mut self, _text: &str) {}
    fn set_touch_penalty_text(&mut self, _text: &str) {}
    fn set_reset_icon(&mut self, _icon: ResetIcon) {}
    fn set_follow_point_fill(&mut self, _address: FollowAddress, _fill: &str) {}
    fn set_tile_summary(&mut self, _layout: &TileSummaryLayout) {}
}

/// Latest value written to each HUD target
#[derive(Debug, Clone, Default)]
pub struct HudRecorder {
    pub timer: String,
    pub score: String,
    pub touches: String,
    pub touch_penalty: String,
    pub reset_icon: ResetIcon,
    pub fills: BTreeMap<FollowAddress, String>,
    pub summaries: BTreeMap<usize, TileSummaryLayout>,
    /// Number of fill writes (for checking that repeats are skipped)
    pub fill_writes: usize,
}

impl HudRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&self, address: FollowAddress) -> Option<&str> {
        self.fills.get(&address).map(String::as_str)
    }
}

impl UiSink for HudRecorder {
    fn set_timer_text(&mut self, text: &str) {
        self.timer = text.to_string();
    }

    fn set_score_text(&mut self, text: &str) {
        self.score = text.to_string();
    }

    fn set_touches_text(&mut self, text: &str) {
        self.touches = text.to_string();
    }

    fn set_touch_penalty_text(&mut self, text: &str) {
        self.touch_penalty = text.to_string();
    }

    fn set_reset_icon(&mut self, icon: ResetIcon) {
        self.reset_icon = icon;
    }

    fn set_follow_point_fill(&mut self, address: FollowAddress, fill: &str) {
        self.fill_writes += 1;
        self.fills.insert(address, fill.to_string());
    }

    fn set_tile_summary(&mut self, layout: &TileSummaryLayout) {
        self.summaries.insert(layout.tile_index, *layout);
    }
}
