//! Challenge, tile and UI snippet documents
//!
//! Documents are YAML. Paths inside a document are resolved through a
//! [`DocumentSource`], so tests can run entirely from memory.

use std::collections::HashMap;
use std::path::PathBuf;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::deg_to_rad;
use crate::error::{RescueError, Result};

/// Resolves a document path to its text
pub trait DocumentSource {
    fn read(&self, path: &str) -> Result<String>;
}

/// Documents held in memory, keyed by path
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocuments {
    docs: HashMap<String, String>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.docs.insert(path.into(), text.into());
    }
}

impl DocumentSource for InMemoryDocuments {
    fn read(&self, path: &str) -> Result<String> {
        self.docs
            .get(path)
            .cloned()
            .ok_or_else(|| RescueError::MissingDocument { path: path.to_string() })
    }
}

/// Documents on disk, searched in root order
#[derive(Debug, Clone, Default)]
pub struct FsDocuments {
    roots: Vec<PathBuf>,
}

impl FsDocuments {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }
}

impl DocumentSource for FsDocuments {
    fn read(&self, path: &str) -> Result<String> {
        for root in &self.roots {
            let candidate = root.join(path);
            if !candidate.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&candidate).map_err(|source| {
                log::warn!("Failed to read {}: {source}", candidate.display());
                RescueError::Io {
                    path: path.to_string(),
                    source,
                }
            })?;
            log::debug!("Loaded {}", candidate.display());
            return Ok(text);
        }
        Err(RescueError::MissingDocument { path: path.to_string() })
    }
}

/// Spawn slot: `[[x, y], rotation_degrees]`, position in tile units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig(pub [f32; 2], pub f32);

impl SpawnConfig {
    /// World-space position
    pub fn position(&self, tile_length: f32) -> Vec2 {
        Vec2::from(self.0) * tile_length
    }

    /// Heading in radians
    pub fn angle(&self) -> f32 {
        deg_to_rad(self.1)
    }
}

/// Where a tile document is placed in the arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilePlacement {
    /// Tile document path
    pub path: String,
    /// Position in tile units
    #[serde(default)]
    pub position: [f32; 2],
    /// Rotation in degrees
    #[serde(default)]
    pub rotation: f32,
}

impl TilePlacement {
    /// World-space origin of the tile
    pub fn origin(&self, tile_length: f32) -> Vec2 {
        Vec2::from(self.position) * tile_length
    }

    pub fn rotation_rad(&self) -> f32 {
        deg_to_rad(self.rotation)
    }
}

/// Top-level challenge document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    pub spawns: Vec<SpawnConfig>,
    pub tiles: Vec<TilePlacement>,
}

impl ChallengeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(source: &dyn DocumentSource, path: &str) -> Result<Self> {
        Self::from_yaml(&source.read(path)?)
    }
}

/// Checker selector plus free-form keyword arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    pub name: String,
    #[serde(default)]
    pub kwargs: serde_yaml::Value,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            name: "none".to_string(),
            kwargs: serde_yaml::Value::Null,
        }
    }
}

/// Decorative scene element in tile-local space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementConfig {
    pub key: String,
    #[serde(default)]
    pub position: [f32; 2],
    /// Degrees
    #[serde(default)]
    pub rotation: f32,
    /// Everything else is passed through to the scene builder untouched
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// One tile document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDocument {
    #[serde(default)]
    pub elements: Vec<ElementConfig>,
    /// Mixed `[x, y]` and `[[[x, y], ...], ...]` entries; validated by the graph builder
    pub follow_points: Vec<serde_yaml::Value>,
    #[serde(default)]
    pub checker: CheckerConfig,
    /// Path of the UI snippet for this tile's summary widget
    #[serde(default)]
    pub ui: Option<String>,
}

impl TileDocument {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(source: &dyn DocumentSource, path: &str) -> Result<Self> {
        Self::from_yaml(&source.read(path)?)
    }
}

/// Layout of a tile summary widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSnippet {
    pub width: f32,
    pub height: f32,
    /// Spawn button centre relative to the widget's top-left
    pub spawn_offset: [f32; 2],
    pub spawn_radius: f32,
}

impl Default for UiSnippet {
    fn default() -> Self {
        Self {
            width: 40.0,
            height: 12.0,
            spawn_offset: [34.0, -6.0],
            spawn_radius: 4.0,
        }
    }
}

impl UiSnippet {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(source: &dyn DocumentSource, path: &str) -> Result<Self> {
        Self::from_yaml(&source.read(path)?)
    }
}
