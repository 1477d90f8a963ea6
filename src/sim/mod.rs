//! Rescue challenge simulation
//!
//! All rules logic lives here. This module must stay deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by tile, entry, branch, point)
//! - No rendering or platform dependencies
//!
//! Physics is reached through [`SensorWorld`]; the HUD through [`crate::ui::UiSink`].

pub mod checker;
pub mod collision;
pub mod completion;
pub mod engine;
pub mod follow;
pub mod score;
pub mod state;
pub mod tick;
pub mod timer;
pub mod watchdog;

pub use checker::{
    BranchChoiceChecker, CheckerContext, CheckerFactory, CheckerInit, CheckerRegistry,
    EngineRequest, NoopChecker, OrderedChecker, TileChecker,
};
pub use collision::{
    BodyKind, CollisionDispatcher, CollisionFilter, Contact, SensorDesc, SensorHandle,
    SensorSpace, SensorTag, SensorWorld,
};
pub use completion::{CompletionEntry, TileCompletion};
pub use engine::RescueEngine;
pub use follow::{FollowAddress, FollowEntry, FollowPointGraph};
pub use score::ScoreEngine;
pub use state::{ChallengePhase, CurrentTarget, PlacedElement, Robot, RobotBody, Tile};
pub use tick::TickInput;
pub use timer::{TimerService, format_countdown};
pub use watchdog::{ProgressWatchdog, WatchdogVerdict};
