//! Per-tile rule strategies
//!
//! A checker is picked by name from a [`CheckerRegistry`] when a tile loads and
//! is called back on spawn, reset and every newly completed waypoint. Checkers
//! reach the engine only through a [`CheckerContext`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::completion::TileCompletion;
use super::follow::FollowPointGraph;
use super::score::ScoreEngine;
use crate::error::{RescueError, Result};
use crate::ui::UiSink;

/// Work a checker asks the engine to do once the callback returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRequest {
    /// Respawn the tracked robot on a tile
    Spawn { tile: usize },
    /// Pause the simulation
    Pause,
}

/// Engine access handed to checker callbacks
pub struct CheckerContext<'a> {
    pub tile_index: usize,
    score: &'a mut ScoreEngine,
    ui: &'a mut dyn UiSink,
    requests: &'a mut Vec<EngineRequest>,
}

impl<'a> CheckerContext<'a> {
    pub fn new(
        tile_index: usize,
        score: &'a mut ScoreEngine,
        ui: &'a mut dyn UiSink,
        requests: &'a mut Vec<EngineRequest>,
    ) -> Self {
        Self {
            tile_index,
            score,
            ui,
            requests,
        }
    }

    pub fn score(&self) -> i64 {
        self.score.score()
    }

    pub fn set_score(&mut self, value: i64) {
        self.score.set_score(value, &mut *self.ui);
    }

    pub fn increment_score(&mut self, amount: i64) {
        self.score.increment_score(amount, &mut *self.ui);
    }

    pub fn decrement_score(&mut self, amount: i64) {
        self.score.decrement_score(amount, &mut *self.ui);
    }

    pub fn request_spawn(&mut self, tile: usize) {
        self.requests.push(EngineRequest::Spawn { tile });
    }

    pub fn request_pause(&mut self) {
        self.requests.push(EngineRequest::Pause);
    }
}

/// Rule strategy for one tile
pub trait TileChecker {
    /// Registry name, for logs
    fn name(&self) -> &'static str;

    /// A robot was placed on this tile by the operator
    fn on_spawn(&mut self, _ctx: &mut CheckerContext<'_>) {}

    /// The whole challenge was reset
    fn on_reset(&mut self, _ctx: &mut CheckerContext<'_>) {}

    /// A waypoint of this tile was completed; `completion` is the whole tile
    fn on_new_follow_point(&mut self, completion: &TileCompletion, ctx: &mut CheckerContext<'_>);
}

/// What a factory gets to build a checker
pub struct CheckerInit<'a> {
    pub tile_index: usize,
    pub graph: &'a FollowPointGraph,
    pub name: &'a str,
    pub kwargs: &'a serde_yaml::Value,
}

impl CheckerInit<'_> {
    /// Decode keyword arguments; absent arguments decode as an empty mapping
    pub fn args<T: DeserializeOwned>(&self) -> Result<T> {
        let value = match self.kwargs {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
            other => other.clone(),
        };
        serde_yaml::from_value(value).map_err(|source| RescueError::CheckerArgs {
            tile: self.tile_index,
            name: self.name.to_string(),
            source,
        })
    }
}

pub type CheckerFactory = fn(&CheckerInit<'_>) -> Result<Box<dyn TileChecker>>;

/// Name → constructor table
#[derive(Clone)]
pub struct CheckerRegistry {
    factories: BTreeMap<String, CheckerFactory>,
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CheckerRegistry {
    /// Empty registry
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding `none`, `ordered` and `branch_choice`
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("none", |_| Ok(Box::new(NoopChecker)));
        registry.register("ordered", |init| {
            Ok(Box::new(OrderedChecker::new(init.graph, init.args()?)))
        });
        registry.register("branch_choice", |init| {
            Ok(Box::new(BranchChoiceChecker::new(init.args()?)))
        });
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: CheckerFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(&self, init: &CheckerInit<'_>) -> Result<Box<dyn TileChecker>> {
        let factory = self
            .factories
            .get(init.name)
            .ok_or_else(|| RescueError::UnknownChecker {
                tile: init.tile_index,
                name: init.name.to_string(),
            })?;
        factory(init)
    }
}

/// Does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChecker;

impl TileChecker for NoopChecker {
    fn name(&self) -> &'static str {
        "none"
    }

    fn on_new_follow_point(&mut self, _completion: &TileCompletion, _ctx: &mut CheckerContext<'_>) {}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderedArgs {
    /// Awarded once when the tile is complete
    pub points: i64,
    /// Charged once when a waypoint is reached ahead of an unfinished one
    pub penalty: i64,
    /// Branch points need every branch, not just one
    pub all_branches: bool,
}

impl Default for OrderedArgs {
    fn default() -> Self {
        Self {
            points: 10,
            penalty: 0,
            all_branches: false,
        }
    }
}

/// Entries must be finished in traversal order
#[derive(Debug, Clone)]
pub struct OrderedChecker {
    args: OrderedArgs,
    entry_count: usize,
    awarded: bool,
    skipped: bool,
}

impl OrderedChecker {
    pub fn new(graph: &FollowPointGraph, args: OrderedArgs) -> Self {
        Self {
            args,
            entry_count: graph.entries().len(),
            awarded: false,
            skipped: false,
        }
    }

    fn entry_done(&self, completion: &TileCompletion, entry: usize) -> bool {
        if self.args.all_branches {
            completion.entry_complete_all(entry)
        } else {
            completion.entry_complete_any(entry)
        }
    }

    /// Some entry has progress while an earlier one is unfinished
    fn out_of_order(&self, completion: &TileCompletion) -> bool {
        let mut gap = false;
        for entry in 0..self.entry_count {
            if gap && completion.entry_touched(entry) {
                return true;
            }
            if !self.entry_done(completion, entry) {
                gap = true;
            }
        }
        false
    }
}

impl TileChecker for OrderedChecker {
    fn name(&self) -> &'static str {
        "ordered"
    }

    fn on_spawn(&mut self, _ctx: &mut CheckerContext<'_>) {
        self.skipped = false;
    }

    fn on_reset(&mut self, _ctx: &mut CheckerContext<'_>) {
        self.awarded = false;
        self.skipped = false;
    }

    fn on_new_follow_point(&mut self, completion: &TileCompletion, ctx: &mut CheckerContext<'_>) {
        if !self.skipped && self.out_of_order(completion) {
            self.skipped = true;
            log::info!("Tile {}: follow point reached out of order", ctx.tile_index);
            if self.args.penalty > 0 {
                ctx.decrement_score(self.args.penalty);
            }
        }
        if !self.awarded && (0..self.entry_count).all(|e| self.entry_done(completion, e)) {
            self.awarded = true;
            log::info!("Tile {} complete (+{})", ctx.tile_index, self.args.points);
            ctx.increment_score(self.args.points);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BranchChoiceArgs {
    pub points: i64,
}

impl Default for BranchChoiceArgs {
    fn default() -> Self {
        Self { points: 10 }
    }
}

/// Any one full branch completes a branch point; order is not enforced
#[derive(Debug, Clone)]
pub struct BranchChoiceChecker {
    args: BranchChoiceArgs,
    awarded: bool,
}

impl BranchChoiceChecker {
    pub fn new(args: BranchChoiceArgs) -> Self {
        Self {
            args,
            awarded: false,
        }
    }
}

impl TileChecker for BranchChoiceChecker {
    fn name(&self) -> &'static str {
        "branch_choice"
    }

    fn on_reset(&mut self, _ctx: &mut CheckerContext<'_>) {
        self.awarded = false;
    }

    fn on_new_follow_point(&mut self, completion: &TileCompletion, ctx: &mut CheckerContext<'_>) {
        if !self.awarded && completion.all_complete_any_branch() {
            self.awarded = true;
            log::info!("Tile {} complete (+{})", ctx.tile_index, self.args.points);
            ctx.increment_score(self.args.points);
        }
    }
}
