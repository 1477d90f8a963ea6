//! Pointer input and the reset/spawn controls
//!
//! Controls are static sensors in the interactive category, found by a point
//! query at the clicked world position. Each is recorded under its key:
//! `reset_button` or `Tile-{index}-spawn`.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{ResetIcon, UiSink};
use crate::consts::INTERACTIVE_CATEGORY;
use crate::sim::collision::{BodyKind, CollisionFilter, SensorDesc, SensorHandle, SensorWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Down,
    Up,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Other(u8),
}

/// Raw pointer event in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub button: PointerButton,
    pub screen_position: Vec2,
}

impl PointerEvent {
    pub fn primary(kind: PointerKind, screen_position: Vec2) -> Self {
        Self {
            kind,
            button: PointerButton::Primary,
            screen_position,
        }
    }
}

/// Screen → world conversion, owned by whatever renders the arena
pub trait ScreenToWorld {
    fn screen_to_world(&self, screen: Vec2) -> Vec2;
}

/// Centred viewport with uniform scale and y pointing up
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub screen_size: Vec2,
    /// World units per pixel
    pub scale: f32,
    /// World point shown at the screen centre
    pub world_center: Vec2,
}

impl ScreenToWorld for ViewportTransform {
    fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let d = screen - self.screen_size / 2.0;
        // Negate Y (screen coords are flipped)
        self.world_center + Vec2::new(d.x, -d.y) * self.scale
    }
}

/// Something clickable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiControl {
    ResetButton,
    TileSpawn(usize),
}

impl UiControl {
    pub const RESET_KEY: &'static str = "reset_button";

    pub fn key(&self) -> String {
        match self {
            UiControl::ResetButton => Self::RESET_KEY.to_string(),
            UiControl::TileSpawn(tile) => format!("Tile-{tile}-spawn"),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        if key == Self::RESET_KEY {
            return Some(UiControl::ResetButton);
        }
        key.strip_prefix("Tile-")?
            .strip_suffix("-spawn")?
            .parse()
            .ok()
            .map(UiControl::TileSpawn)
    }
}

/// What the engine should do in response to a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Reset,
    SpawnAt(usize),
}

/// Turns pointer events into reset/spawn actions
#[derive(Debug, Clone, Default)]
pub struct UiController {
    controls: HashMap<SensorHandle, String>,
    reset_pressed: bool,
}

impl UiController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_reset_pressed(&self) -> bool {
        self.reset_pressed
    }

    /// Register a clickable circle for `control`
    pub fn register_control<W: SensorWorld + ?Sized>(
        &mut self,
        world: &mut W,
        control: UiControl,
        position: Vec2,
        radius: f32,
    ) -> SensorHandle {
        let handle = world.add_sensor(SensorDesc {
            position,
            radius,
            filter: CollisionFilter::INTERACTIVE,
            collision_type: 0,
            kind: BodyKind::Static,
        });
        self.controls.insert(handle, control.key());
        handle
    }

    /// First known control under `point`
    pub fn control_at<W: SensorWorld + ?Sized>(&self, world: &W, point: Vec2) -> Option<UiControl> {
        world
            .point_query(point, INTERACTIVE_CATEGORY)
            .into_iter()
            .filter_map(|h| self.controls.get(&h))
            .find_map(|key| UiControl::from_key(key))
    }

    /// Handle one pointer event. Only the primary button is consumed.
    pub fn handle_event<W: SensorWorld + ?Sized>(
        &mut self,
        event: &PointerEvent,
        world: &W,
        to_world: &dyn ScreenToWorld,
        ui: &mut dyn UiSink,
    ) -> Option<UiAction> {
        if event.button != PointerButton::Primary {
            return None;
        }
        match event.kind {
            PointerKind::Down => {
                let point = to_world.screen_to_world(event.screen_position);
                match self.control_at(world, point)? {
                    UiControl::ResetButton => {
                        self.reset_pressed = true;
                        ui.set_reset_icon(ResetIcon::Pressed);
                        None
                    }
                    UiControl::TileSpawn(tile) => Some(UiAction::SpawnAt(tile)),
                }
            }
            PointerKind::Up => {
                let point = to_world.screen_to_world(event.screen_position);
                let released_on_reset = self.control_at(world, point) == Some(UiControl::ResetButton);
                let fire = self.reset_pressed && released_on_reset;
                if self.reset_pressed {
                    ui.set_reset_icon(ResetIcon::Idle);
                }
                self.reset_pressed = false;
                fire.then_some(UiAction::Reset)
            }
            PointerKind::Move => None,
        }
    }

    /// Remove every control sensor from the world
    pub fn teardown<W: SensorWorld + ?Sized>(&mut self, world: &mut W) {
        for handle in self.controls.keys() {
            world.remove_sensor(*handle);
        }
        self.controls.clear();
        self.reset_pressed = false;
    }
}
