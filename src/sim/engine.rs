//! The rescue challenge engine
//!
//! Owns tiles, robots, score and timer, plus the sensor world and HUD it was
//! handed at construction. The outer driver calls in at three points:
//! contacts after each physics step, [`RescueEngine::tick`] once per tick,
//! and pointer events between ticks.

use glam::Vec2;

use super::checker::{CheckerContext, CheckerRegistry, EngineRequest, TileChecker};
use super::collision::{CollisionDispatcher, Contact, SensorHandle, SensorSpace, SensorWorld};
use super::completion::TileCompletion;
use super::follow::FollowAddress;
use super::score::ScoreEngine;
use super::state::{ChallengePhase, CurrentTarget, Robot, RobotBody, Tile};
use super::timer::TimerService;
use super::watchdog::ProgressWatchdog;
use crate::config::{ChallengeConfig, DocumentSource};
use crate::error::{RescueError, Result};
use crate::settings::RescueSettings;
use crate::ui::{
    COMPLETED_FILL, FOLLOW_POINT_FILL, HudRecorder, PointerEvent, ScreenToWorld, UiAction, UiControl,
    UiController, UiSink,
};

pub struct RescueEngine<W: SensorWorld = SensorSpace, U: UiSink = HudRecorder> {
    pub(super) settings: RescueSettings,
    pub(super) world: W,
    pub(super) ui: U,
    pub(super) dispatcher: CollisionDispatcher,
    pub(super) controls: UiController,
    pub(super) tiles: Vec<Tile>,
    pub(super) robots: Vec<Robot>,
    pub(super) score: ScoreEngine,
    pub(super) timer: TimerService,
    pub(super) watchdog: ProgressWatchdog,
    pub(super) phase: ChallengePhase,
    pub(super) current_target: Option<CurrentTarget>,
    /// Checker requests not yet carried out
    pending: Vec<EngineRequest>,
    applying: bool,
}

impl<W: SensorWorld, U: UiSink> RescueEngine<W, U> {
    /// Load every tile, register sensors and controls, and place robots on their spawns.
    ///
    /// `robots` are the bodies found in the scene, in robot-index order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: RescueSettings,
        config: &ChallengeConfig,
        docs: &dyn DocumentSource,
        registry: &CheckerRegistry,
        robots: Vec<RobotBody>,
        mut world: W,
        ui: U,
    ) -> Result<Self> {
        if robots.is_empty() {
            return Err(RescueError::NoRobots);
        }
        if robots.len() > config.spawns.len() {
            return Err(RescueError::NotEnoughSpawns {
                robots: robots.len(),
                spawns: config.spawns.len(),
            });
        }

        let tiles = config
            .tiles
            .iter()
            .enumerate()
            .map(|(i, placement)| Tile::load(i, placement, docs, registry, &settings))
            .collect::<Result<Vec<_>>>()?;

        let mut dispatcher = CollisionDispatcher::new();
        let mut controls = UiController::new();
        for tile in &tiles {
            dispatcher.register_graph(&mut world, &tile.graph, settings.follow_point_radius);
            controls.register_control(
                &mut world,
                UiControl::TileSpawn(tile.index),
                tile.summary.spawn_button,
                tile.summary.spawn_radius,
            );
        }
        controls.register_control(
            &mut world,
            UiControl::ResetButton,
            settings.reset_button_position,
            settings.reset_button_radius,
        );

        let robots = robots
            .into_iter()
            .zip(&config.spawns)
            .map(|(body, spawn)| Robot {
                follower: dispatcher.register_robot(
                    &mut world,
                    body.position,
                    settings.robot_centre_radius,
                ),
                body,
                spawn: *spawn,
            })
            .collect::<Vec<_>>();

        let mut engine = Self {
            score: ScoreEngine::new(settings.touch_penalty, settings.max_touch_penalty),
            timer: TimerService::new(settings.start_time_secs, settings.tick_rate),
            watchdog: ProgressWatchdog::new(settings.max_follow_dist),
            settings,
            world,
            ui,
            dispatcher,
            controls,
            tiles,
            robots,
            phase: ChallengePhase::Running,
            current_target: None,
            pending: Vec::new(),
            applying: false,
        };

        for i in 0..engine.tiles.len() {
            let summary = engine.tiles[i].summary;
            engine.ui.set_tile_summary(&summary);
            engine.paint_tile(i, FOLLOW_POINT_FILL);
        }
        engine.reset_positions();
        engine.sync_followers();
        engine.score.reset(&mut engine.ui);
        engine.ui.set_timer_text(&engine.timer.display());

        log::info!(
            "Rescue challenge loaded: {} tiles, {} robots",
            engine.tiles.len(),
            engine.robots.len()
        );
        Ok(engine)
    }

    pub fn settings(&self) -> &RescueSettings {
        &self.settings
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// The physics driver steps the world through this
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> Result<&Tile> {
        self.tiles.get(index).ok_or(RescueError::TileOutOfRange {
            index,
            count: self.tiles.len(),
        })
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    /// Robot body for the control layer to drive
    pub fn robot_body_mut(&mut self, index: usize) -> Result<&mut RobotBody> {
        let count = self.robots.len();
        self.robots
            .get_mut(index)
            .map(|r| &mut r.body)
            .ok_or(RescueError::RobotOutOfRange { index, count })
    }

    pub fn score(&self) -> &ScoreEngine {
        &self.score
    }

    pub fn timer(&self) -> &TimerService {
        &self.timer
    }

    pub fn phase(&self) -> ChallengePhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.phase.is_paused()
    }

    pub fn current_target(&self) -> Option<CurrentTarget> {
        self.current_target
    }

    /// Operator pause/resume. A timed-out run only leaves `TimeUp` through [`Self::reset`].
    pub fn set_paused(&mut self, paused: bool) {
        if self.phase == ChallengePhase::TimeUp {
            return;
        }
        self.phase = if paused {
            ChallengePhase::Paused
        } else {
            ChallengePhase::Running
        };
    }

    pub fn set_score(&mut self, value: i64) {
        self.score.set_score(value, &mut self.ui);
    }

    pub fn increment_score(&mut self, amount: i64) {
        self.score.increment_score(amount, &mut self.ui);
    }

    pub fn decrement_score(&mut self, amount: i64) {
        self.score.decrement_score(amount, &mut self.ui);
    }

    /// Penalise an operator touch. Returns the penalty charged.
    pub fn touch_bot(&mut self) -> i64 {
        self.score.touch_bot(&mut self.ui)
    }

    /// Route every begin-contact from a physics step
    pub fn after_physics(&mut self, contacts: &[Contact]) -> Result<()> {
        for contact in contacts {
            self.on_contact(contact.a, contact.b)?;
        }
        Ok(())
    }

    /// A follower touched a waypoint sensor.
    ///
    /// Any other pairing is an invariant violation and returned as an error.
    pub fn on_contact(&mut self, a: SensorHandle, b: SensorHandle) -> Result<()> {
        let (address, robot) = self.dispatcher.resolve(a, b)?;
        let tile_index = address.tile();
        let count = self.tiles.len();
        let tile = self
            .tiles
            .get_mut(tile_index)
            .ok_or(RescueError::TileOutOfRange { index: tile_index, count })?;

        if tile.completion.mark(address) != Some(true) {
            return Ok(());
        }

        log::debug!("Robot {robot} reached follow point {address}");
        let finished = tile.completion.all_complete_any_branch();
        notify_checker(
            tile,
            &mut self.score,
            &mut self.ui,
            &mut self.pending,
            |checker, completion, ctx| checker.on_new_follow_point(completion, ctx),
        );
        // Nothing left to measure against on a finished tile
        self.current_target = if finished {
            log::debug!("Tile {tile_index} finished");
            None
        } else {
            Some(CurrentTarget { address, robot })
        };
        self.paint_point(address, COMPLETED_FILL);
        self.apply_requests()
    }

    /// Respawn the tracked robot (robot 0) on a tile
    pub fn spawn_at(&mut self, tile_index: usize) -> Result<()> {
        self.spawn_robot_at(0, tile_index)
    }

    /// Clear the tile's progress, put the robot's follower on the tile's first
    /// waypoint facing the next one, and charge a touch. Ends a lack-of-progress pause.
    pub fn spawn_robot_at(&mut self, robot: usize, tile_index: usize) -> Result<()> {
        if robot >= self.robots.len() {
            return Err(RescueError::RobotOutOfRange {
                index: robot,
                count: self.robots.len(),
            });
        }
        let tile = self.tile(tile_index)?;
        let points = tile.graph.addresses();
        let Some(&(_, first)) = points.first() else {
            return Err(RescueError::EmptyTile { tile: tile_index });
        };
        let heading = match points.get(1) {
            Some((_, next)) if next.distance_squared(first) > 0.0 => {
                let d = *next - first;
                d.y.atan2(d.x)
            }
            _ => self.robots[robot].body.angle,
        };

        self.tiles[tile_index].completion.reset();
        self.paint_tile(tile_index, FOLLOW_POINT_FILL);
        self.current_target = None;
        if self.phase == ChallengePhase::LackOfProgress {
            self.phase = ChallengePhase::Running;
        }

        let r = &mut self.robots[robot];
        r.body.place(first, heading);
        self.world.set_position(r.follower, first);
        // A follower already resting on the waypoint must touch it again
        self.world.forget_contacts(r.follower);

        let penalty = self.touch_bot();
        log::info!("Robot {robot} respawned on tile {tile_index} (-{penalty})");

        notify_checker(
            &mut self.tiles[tile_index],
            &mut self.score,
            &mut self.ui,
            &mut self.pending,
            |checker, _, ctx| checker.on_spawn(ctx),
        );
        self.apply_requests()
    }

    /// Put everything back to the start of the run
    pub fn reset(&mut self) -> Result<()> {
        self.reset_positions();
        self.sync_followers();
        for robot in &self.robots {
            self.world.forget_contacts(robot.follower);
        }

        self.timer.reset();
        self.ui.set_timer_text(&self.timer.display());
        self.score.reset(&mut self.ui);

        for i in 0..self.tiles.len() {
            self.tiles[i].completion.reset();
            self.paint_tile(i, FOLLOW_POINT_FILL);
        }
        self.current_target = None;
        self.phase = ChallengePhase::Running;

        for tile in &mut self.tiles {
            notify_checker(
                tile,
                &mut self.score,
                &mut self.ui,
                &mut self.pending,
                |checker, _, ctx| checker.on_reset(ctx),
            );
        }
        log::info!("Rescue challenge reset");
        self.apply_requests()
    }

    /// Feed one pointer event through the UI controls
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        to_world: &dyn ScreenToWorld,
    ) -> Result<Option<UiAction>> {
        let action = self
            .controls
            .handle_event(event, &self.world, to_world, &mut self.ui);
        match action {
            Some(UiAction::Reset) => self.reset()?,
            Some(UiAction::SpawnAt(tile)) => self.spawn_at(tile)?,
            None => {}
        }
        Ok(action)
    }

    /// Remove every sensor the engine registered and hand back the world and HUD
    pub fn teardown(mut self) -> (W, U) {
        self.dispatcher.teardown(&mut self.world);
        self.controls.teardown(&mut self.world);
        log::info!("Rescue challenge torn down");
        (self.world, self.ui)
    }

    /// Robots back on their spawn poses, stopped
    fn reset_positions(&mut self) {
        let tile_length = self.settings.tile_length;
        for robot in &mut self.robots {
            robot
                .body
                .place(robot.spawn.position(tile_length), robot.spawn.angle());
        }
    }

    /// Move each follower sensor onto its robot
    pub(super) fn sync_followers(&mut self) {
        for robot in &self.robots {
            self.world.set_position(robot.follower, robot.body.position);
        }
    }

    /// Position of a robot's follower sensor
    pub(super) fn follower_position(&self, robot: usize) -> Option<Vec2> {
        let r = self.robots.get(robot)?;
        self.world.position(r.follower).or(Some(r.body.position))
    }

    fn paint_tile(&mut self, tile_index: usize, fill: &str) {
        let Some(tile) = self.tiles.get(tile_index) else {
            return;
        };
        for (address, _) in tile.graph.addresses() {
            self.paint_point(address, fill);
        }
    }

    fn paint_point(&mut self, address: FollowAddress, fill: &str) {
        if self.settings.show_follow_points {
            self.ui.set_follow_point_fill(address, fill);
        }
    }

    /// Carry out requests queued by checkers. Requests raised while doing so wait for the next call.
    fn apply_requests(&mut self) -> Result<()> {
        if self.applying {
            return Ok(());
        }
        self.applying = true;
        let result = self.drain_requests();
        self.applying = false;
        result
    }

    fn drain_requests(&mut self) -> Result<()> {
        for request in std::mem::take(&mut self.pending) {
            match request {
                EngineRequest::Spawn { tile } => {
                    let robot = self.current_target.map_or(0, |t| t.robot);
                    self.spawn_robot_at(robot, tile)?;
                }
                EngineRequest::Pause => self.set_paused(true),
            }
        }
        Ok(())
    }
}

/// Run a checker callback with engine access
fn notify_checker<U: UiSink>(
    tile: &mut Tile,
    score: &mut ScoreEngine,
    ui: &mut U,
    pending: &mut Vec<EngineRequest>,
    f: impl FnOnce(&mut dyn TileChecker, &TileCompletion, &mut CheckerContext<'_>),
) {
    let mut ctx = CheckerContext::new(tile.index, score, ui, pending);
    f(tile.checker.as_mut(), &tile.completion, &mut ctx);
}
