//! Challenge state types
//!
//! Tiles own their graph, completion mirror and checker. Robot bodies are
//! driven from outside; the engine only places them and reads their pose.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::checker::{CheckerInit, CheckerRegistry, TileChecker};
use super::collision::SensorHandle;
use super::completion::TileCompletion;
use super::follow::{FollowAddress, FollowPointGraph};
use crate::config::{DocumentSource, SpawnConfig, TileDocument, TilePlacement, UiSnippet};
use crate::error::Result;
use crate::local_to_world;
use crate::settings::RescueSettings;
use crate::ui::TileSummaryLayout;

/// Current phase of the challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengePhase {
    Running,
    /// Paused by the operator or a checker
    Paused,
    /// Robot drifted too far from its target
    LackOfProgress,
    /// Countdown reached zero
    TimeUp,
}

impl ChallengePhase {
    pub fn is_paused(&self) -> bool {
        *self != ChallengePhase::Running
    }
}

/// Pose and velocity of a robot's physics body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotBody {
    pub position: Vec2,
    /// Heading (radians)
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
}

impl RobotBody {
    pub fn at(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            angle,
            ..Default::default()
        }
    }

    /// Teleport and stop
    pub fn place(&mut self, position: Vec2, angle: f32) {
        self.position = position;
        self.angle = angle;
        self.velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
    }
}

/// A robot taking part in the challenge
#[derive(Debug, Clone)]
pub struct Robot {
    pub body: RobotBody,
    /// Point sensor that tracks `body.position`
    pub follower: SensorHandle,
    pub spawn: SpawnConfig,
}

/// The waypoint the watchdog measures against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentTarget {
    pub address: FollowAddress,
    /// Robot whose follower reached it
    pub robot: usize,
}

/// Decorative element placed in world space
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedElement {
    /// `Tile-{index}-{key}`
    pub key: String,
    pub position: Vec2,
    /// Radians
    pub rotation: f32,
    pub extra: serde_yaml::Mapping,
}

/// One placed challenge segment
pub struct Tile {
    pub index: usize,
    pub origin: Vec2,
    /// Radians
    pub rotation: f32,
    pub graph: FollowPointGraph,
    pub completion: TileCompletion,
    pub checker: Box<dyn TileChecker>,
    pub elements: Vec<PlacedElement>,
    pub summary: TileSummaryLayout,
}

impl Tile {
    /// Load the tile document behind `placement` and place everything in world space
    pub fn load(
        index: usize,
        placement: &TilePlacement,
        docs: &dyn DocumentSource,
        registry: &CheckerRegistry,
        settings: &RescueSettings,
    ) -> Result<Self> {
        let doc = TileDocument::load(docs, &placement.path)?;
        let origin = placement.origin(settings.tile_length);
        let rotation = placement.rotation_rad();

        let mut elements: Vec<PlacedElement> = doc
            .elements
            .iter()
            .map(|el| PlacedElement {
                key: format!("Tile-{index}-{}", el.key),
                position: local_to_world(Vec2::from(el.position), rotation, origin),
                rotation: crate::deg_to_rad(el.rotation) + rotation,
                extra: el.extra.clone(),
            })
            .collect();
        elements.push(outline_element(index, origin, rotation, settings.tile_length));

        let graph = FollowPointGraph::from_config(index, &doc.follow_points, rotation, origin)?;
        let completion = TileCompletion::from_graph(&graph);
        let checker = registry.build(&CheckerInit {
            tile_index: index,
            graph: &graph,
            name: &doc.checker.name,
            kwargs: &doc.checker.kwargs,
        })?;

        let snippet = match &doc.ui {
            Some(path) => UiSnippet::load(docs, path)?,
            None => UiSnippet::default(),
        };
        let summary = summary_layout(index, &snippet, settings);

        log::debug!(
            "Tile {index} loaded from {} ({} follow points, checker `{}`)",
            placement.path,
            graph.point_count(),
            checker.name()
        );

        Ok(Self {
            index,
            origin,
            rotation,
            graph,
            completion,
            checker,
            elements,
            summary,
        })
    }
}

fn outline_element(index: usize, origin: Vec2, rotation: f32, tile_length: f32) -> PlacedElement {
    let mut extra = serde_yaml::Mapping::new();
    extra.insert("type".into(), "visual".into());
    extra.insert("name".into(), "Rectangle".into());
    extra.insert("width".into(), f64::from(tile_length).into());
    extra.insert("height".into(), f64::from(tile_length).into());
    extra.insert("stroke".into(), "rescue_outline_color".into());
    PlacedElement {
        key: format!("Tile-{index}-outline"),
        position: origin,
        rotation,
        extra,
    }
}

/// Summary widgets stack downward from `summary_origin`
fn summary_layout(index: usize, snippet: &UiSnippet, settings: &RescueSettings) -> TileSummaryLayout {
    let step = snippet.height + settings.summary_spacing;
    let position = settings.summary_origin - Vec2::Y * step * index as f32;
    TileSummaryLayout {
        tile_index: index,
        position,
        size: Vec2::new(snippet.width, snippet.height),
        spawn_button: position + Vec2::from(snippet.spawn_offset),
        spawn_radius: snippet.spawn_radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InMemoryDocuments;
    use crate::error::RescueError;

    const TILE: &str = r#"
elements:
  - key: line
    position: [5, 0]
    rotation: 90
    type: visual
follow_points:
  - [0, 0]
  - [5, 0]
checker:
  name: ordered
  kwargs: { points: 20 }
ui: ui/summary.yaml
"#;

    fn docs() -> InMemoryDocuments {
        InMemoryDocuments::new()
            .with("tiles/a.yaml", TILE)
            .with("ui/summary.yaml", "width: 50\nheight: 10\nspawn_offset: [45, -5]\nspawn_radius: 3\n")
    }

    fn placement() -> TilePlacement {
        TilePlacement {
            path: "tiles/a.yaml".into(),
            position: [1.0, 0.0],
            rotation: 180.0,
        }
    }

    #[test]
    fn test_tile_load_places_everything() {
        let settings = RescueSettings::default();
        let tile = Tile::load(1, &placement(), &docs(), &CheckerRegistry::default(), &settings)
            .unwrap();

        assert_eq!(tile.origin, Vec2::new(30.0, 0.0));
        assert!(tile.completion.mirrors(&tile.graph));
        assert_eq!(tile.checker.name(), "ordered");

        let p = tile.graph.point(FollowAddress::Single { tile: 1, entry: 1 }).unwrap();
        assert!((p - Vec2::new(25.0, 0.0)).length() < 1e-4);

        assert_eq!(tile.elements.len(), 2);
        assert_eq!(tile.elements[0].key, "Tile-1-line");
        assert!((tile.elements[0].position - Vec2::new(25.0, 0.0)).length() < 1e-4);
        assert_eq!(tile.elements[1].key, "Tile-1-outline");

        assert_eq!(tile.summary.size, Vec2::new(50.0, 10.0));
        let expected = settings.summary_origin - Vec2::Y * (10.0 + settings.summary_spacing);
        assert_eq!(tile.summary.position, expected);
        assert_eq!(tile.summary.spawn_button, expected + Vec2::new(45.0, -5.0));
    }

    #[test]
    fn test_tile_missing_ui_snippet() {
        let docs = InMemoryDocuments::new().with("tiles/a.yaml", TILE);
        let err = Tile::load(0, &placement(), &docs, &CheckerRegistry::default(), &RescueSettings::default())
            .err()
            .unwrap();
        assert!(matches!(err, RescueError::MissingDocument { path } if path == "ui/summary.yaml"));
    }

    #[test]
    fn test_robot_place_stops_body() {
        let mut body = RobotBody {
            position: Vec2::ONE,
            angle: 1.0,
            velocity: Vec2::new(3.0, 4.0),
            angular_velocity: 2.0,
        };
        body.place(Vec2::ZERO, 0.5);
        assert_eq!(body, RobotBody::at(Vec2::ZERO, 0.5));
    }

    #[test]
    fn test_phase_pause_flag() {
        assert!(!ChallengePhase::Running.is_paused());
        assert!(ChallengePhase::Paused.is_paused());
        assert!(ChallengePhase::LackOfProgress.is_paused());
        assert!(ChallengePhase::TimeUp.is_paused());
    }
}
