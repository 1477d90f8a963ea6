//! Error types for challenge loading and runtime invariants.
//!
//! Every variant is fatal: the harness is deterministic and nothing here is retried.

use thiserror::Error;

use crate::sim::collision::SensorTag;

/// Errors raised while loading or running a rescue challenge.
#[derive(Debug, Error)]
pub enum RescueError {
    /// No robot was handed to the engine.
    #[error("no robots loaded")]
    NoRobots,

    /// More robots than spawn slots.
    #[error("not enough spawning locations specified: {robots} robots, {spawns} spawns")]
    NotEnoughSpawns {
        /// Number of robots.
        robots: usize,
        /// Number of spawn slots.
        spawns: usize,
    },

    /// A contact between two sensors that is not waypoint + follower.
    #[error("contact between {first:?} and {second:?} does not pair a follow point with a robot follower")]
    InvalidContact {
        /// Tag of the first sensor (if known).
        first: Option<SensorTag>,
        /// Tag of the second sensor (if known).
        second: Option<SensorTag>,
    },

    /// Follow-point list with inconsistent nesting.
    #[error("tile {tile}: malformed follow points: {reason}")]
    MalformedFollowPoints {
        /// Tile index.
        tile: usize,
        /// What was wrong.
        reason: String,
    },

    /// Checker selector with no registered factory.
    #[error("tile {tile}: unknown checker `{name}`")]
    UnknownChecker {
        /// Tile index.
        tile: usize,
        /// Selector name.
        name: String,
    },

    /// Checker keyword arguments did not match the checker.
    #[error("tile {tile}: bad arguments for checker `{name}`: {source}")]
    CheckerArgs {
        /// Tile index.
        tile: usize,
        /// Selector name.
        name: String,
        /// Underlying decode error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Referenced document could not be found.
    #[error("missing document: {path}")]
    MissingDocument {
        /// Path as written in the referencing document.
        path: String,
    },

    /// Referenced document exists but could not be read.
    #[error("failed to read document {path}: {source}")]
    Io {
        /// Path as written in the referencing document.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// YAML decode failure.
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON decode failure.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Tile index out of range.
    #[error("tile index {index} out of range ({count} tiles)")]
    TileOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of tiles.
        count: usize,
    },

    /// Robot index out of range.
    #[error("robot index {index} out of range ({count} robots)")]
    RobotOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of robots.
        count: usize,
    },

    /// Tile has no waypoint to spawn on.
    #[error("tile {tile} has no follow points")]
    EmptyTile {
        /// Tile index.
        tile: usize,
    },
}

/// Result alias for rescue operations.
pub type Result<T> = std::result::Result<T, RescueError>;
