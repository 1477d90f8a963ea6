//! Fixed timestep tick
//!
//! Per tick: sync follower sensors onto their robots, run the lack-of-progress
//! watchdog, then advance the countdown. Contacts for the tick have already
//! been delivered by the physics step.

use super::collision::SensorWorld;
use super::engine::RescueEngine;
use super::state::ChallengePhase;
use super::watchdog::WatchdogVerdict;
use crate::settings::TimeoutBehavior;
use crate::ui::UiSink;

/// Operator input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pause toggle
    pub pause: bool,
}

impl<W: SensorWorld, U: UiSink> RescueEngine<W, U> {
    /// Advance the challenge by one tick
    pub fn tick(&mut self, input: &TickInput) {
        if input.pause {
            let paused = self.is_paused();
            self.set_paused(!paused);
        }

        self.sync_followers();
        self.check_progress();
        self.update_time();
    }

    /// Pause and drop the target when the tracked follower wanders off
    fn check_progress(&mut self) {
        let Some(target) = self.current_target else {
            return;
        };
        let point = self
            .tiles
            .get(target.address.tile())
            .and_then(|t| t.graph.point(target.address));
        let Some(follower) = self.follower_position(target.robot) else {
            return;
        };

        if let WatchdogVerdict::LackOfProgress { distance_sq } =
            self.watchdog.check(self.is_paused(), point, follower)
        {
            log::info!(
                "Lack of progress: robot {} is {:.1} from follow point {}",
                target.robot,
                distance_sq.sqrt(),
                target.address
            );
            self.phase = ChallengePhase::LackOfProgress;
            self.current_target = None;
        }
    }

    fn update_time(&mut self) {
        if !self.timer.advance(self.is_paused()) {
            return;
        }
        self.ui.set_timer_text(&self.timer.display());

        if self.timer.expired() && self.settings.timeout == TimeoutBehavior::Pause {
            log::info!("Time up after {} ticks", self.timer.tick_count());
            self.phase = ChallengePhase::TimeUp;
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::config::{ChallengeConfig, InMemoryDocuments};
    use crate::error::RescueError;
    use crate::settings::RescueSettings;
    use crate::sim::checker::{CheckerContext, CheckerRegistry, TileChecker};
    use crate::sim::completion::TileCompletion;
    use crate::sim::collision::{SensorSpace, SensorWorld};
    use crate::sim::follow::FollowAddress;
    use crate::sim::state::RobotBody;
    use crate::ui::{
        COMPLETED_FILL, FOLLOW_POINT_FILL, HudRecorder, PointerEvent, PointerKind, ResetIcon,
        ScreenToWorld, UiAction,
    };

    const CHALLENGE: &str = r#"
spawns:
  - [[0, 0], 0]
  - [[0, 1], 90]
tiles:
  - path: tiles/straight.yaml
    position: [0, 0]
  - path: tiles/fork.yaml
    position: [1, 0]
"#;

    const STRAIGHT: &str = r#"
follow_points:
  - [0, 0]
  - [5, 0]
  - [10, 0]
checker:
  name: ordered
  kwargs: { points: 10 }
"#;

    const FORK: &str = r#"
follow_points:
  - [0, 0]
  - [[[5, 3], [10, 3]], [[5, -3]]]
checker:
  name: branch_choice
  kwargs: { points: 15 }
"#;

    struct Identity;

    impl ScreenToWorld for Identity {
        fn screen_to_world(&self, screen: Vec2) -> Vec2 {
            screen
        }
    }

    fn docs() -> InMemoryDocuments {
        InMemoryDocuments::new()
            .with("tiles/straight.yaml", STRAIGHT)
            .with("tiles/fork.yaml", FORK)
    }

    fn engine_with(settings: RescueSettings, robots: usize) -> RescueEngine {
        let config = ChallengeConfig::from_yaml(CHALLENGE).unwrap();
        RescueEngine::new(
            settings,
            &config,
            &docs(),
            &CheckerRegistry::default(),
            vec![RobotBody::default(); robots],
            SensorSpace::new(),
            HudRecorder::new(),
        )
        .unwrap()
    }

    fn engine() -> RescueEngine {
        engine_with(RescueSettings::default(), 1)
    }

    fn engine_from(docs: &InMemoryDocuments, registry: &CheckerRegistry) -> RescueEngine {
        let config = ChallengeConfig::from_yaml(CHALLENGE).unwrap();
        RescueEngine::new(
            RescueSettings::default(),
            &config,
            docs,
            registry,
            vec![RobotBody::default()],
            SensorSpace::new(),
            HudRecorder::new(),
        )
        .unwrap()
    }

    /// Scores one point per callback
    struct Tally;

    impl TileChecker for Tally {
        fn name(&self) -> &'static str {
            "tally"
        }

        fn on_new_follow_point(
            &mut self,
            _completion: &TileCompletion,
            ctx: &mut CheckerContext<'_>,
        ) {
            ctx.increment_score(1);
        }
    }

    /// Drive robot `robot` to `pos`, then run one physics step and one tick
    fn drive_to(engine: &mut RescueEngine, robot: usize, pos: Vec2) {
        engine.robot_body_mut(robot).unwrap().position = pos;
        let follower = engine.robots()[robot].follower;
        engine.world_mut().set_position(follower, pos);
        let contacts = engine.world_mut().step();
        engine.after_physics(&contacts).unwrap();
        engine.tick(&TickInput::default());
    }

    const S0: FollowAddress = FollowAddress::Single { tile: 0, entry: 0 };
    const S1: FollowAddress = FollowAddress::Single { tile: 0, entry: 1 };

    #[test]
    fn test_startup_preconditions() {
        let config = ChallengeConfig::from_yaml(CHALLENGE).unwrap();
        let build = |robots: usize| {
            RescueEngine::new(
                RescueSettings::default(),
                &config,
                &docs(),
                &CheckerRegistry::default(),
                vec![RobotBody::default(); robots],
                SensorSpace::new(),
                HudRecorder::new(),
            )
        };
        assert!(matches!(build(0).err(), Some(RescueError::NoRobots)));
        assert!(matches!(
            build(3).err(),
            Some(RescueError::NotEnoughSpawns { robots: 3, spawns: 2 })
        ));
        assert!(build(2).is_ok());
    }

    #[test]
    fn test_startup_places_robots_and_hud() {
        let engine = engine_with(RescueSettings::default(), 2);
        assert_eq!(engine.robots()[1].body.position, Vec2::new(0.0, 30.0));
        let follower = engine.robots()[1].follower;
        assert_eq!(engine.world().position(follower), Some(Vec2::new(0.0, 30.0)));

        let hud = engine.ui();
        assert_eq!(hud.timer, "05:00");
        assert_eq!(hud.score, "0");
        assert_eq!(hud.summaries.len(), 2);
        assert_eq!(hud.fill(S0), Some(FOLLOW_POINT_FILL));
        for tile in engine.tiles() {
            assert!(tile.completion.mirrors(&tile.graph));
        }
    }

    #[test]
    fn test_contact_completes_and_is_idempotent() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(5.0, 0.5));

        assert_eq!(engine.tiles()[0].completion.get(S1), Some(true));
        assert_eq!(engine.current_target().map(|t| t.address), Some(S1));
        assert_eq!(engine.ui().fill(S1), Some(COMPLETED_FILL));

        // Redeliver the same contact
        let writes = engine.ui().fill_writes;
        let score = engine.score().score();
        let follower = engine.robots()[0].follower;
        let sensor = engine.dispatcher.follow_sensor(S1).unwrap();
        engine.on_contact(sensor, follower).unwrap();
        engine.on_contact(follower, sensor).unwrap();
        assert_eq!(engine.ui().fill_writes, writes);
        assert_eq!(engine.score().score(), score);
    }

    #[test]
    fn test_redelivered_contact_skips_checker() {
        let docs = docs().with(
            "tiles/straight.yaml",
            "follow_points:\n  - [0, 0]\n  - [5, 0]\n  - [10, 0]\nchecker:\n  name: tally\n",
        );
        let mut registry = CheckerRegistry::with_builtins();
        registry.register("tally", |_| Ok(Box::new(Tally)));
        let mut engine = engine_from(&docs, &registry);

        drive_to(&mut engine, 0, Vec2::new(5.0, 0.0));
        assert_eq!(engine.score().score(), 1);

        let follower = engine.robots()[0].follower;
        let sensor = engine.dispatcher.follow_sensor(S1).unwrap();
        engine.on_contact(sensor, follower).unwrap();
        engine.on_contact(follower, sensor).unwrap();
        assert_eq!(engine.score().score(), 1);
    }

    #[test]
    fn test_hidden_follow_points_are_never_painted() {
        let settings = RescueSettings {
            show_follow_points: false,
            ..Default::default()
        };
        let mut engine = engine_with(settings, 1);
        drive_to(&mut engine, 0, Vec2::new(5.0, 0.0));
        assert_eq!(engine.tiles()[0].completion.get(S1), Some(true));
        assert_eq!(engine.ui().fill(S1), None);
        assert_eq!(engine.ui().fill_writes, 0);
    }

    #[test]
    fn test_finished_tile_clears_target() {
        let mut engine = engine();
        for x in [0.0, 5.0, 10.0] {
            drive_to(&mut engine, 0, Vec2::new(x, 0.0));
        }
        assert!(engine.current_target().is_none());

        // On the way to the next tile, well past the follow distance
        drive_to(&mut engine, 0, Vec2::new(22.0, 0.0));
        assert_eq!(engine.phase(), ChallengePhase::Running);

        drive_to(&mut engine, 0, Vec2::new(30.0, 0.0));
        let fork_first = FollowAddress::Single { tile: 1, entry: 0 };
        assert_eq!(engine.current_target().map(|t| t.address), Some(fork_first));
    }

    #[test]
    fn test_invalid_contact_is_fatal() {
        let mut engine = engine();
        let a = engine.dispatcher.follow_sensor(S0).unwrap();
        let b = engine.dispatcher.follow_sensor(S1).unwrap();
        assert!(matches!(
            engine.on_contact(a, b),
            Err(RescueError::InvalidContact { .. })
        ));
    }

    #[test]
    fn test_checker_scores_tile() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(0.0, 0.0));
        drive_to(&mut engine, 0, Vec2::new(5.0, 0.0));
        drive_to(&mut engine, 0, Vec2::new(10.0, 0.0));
        assert_eq!(engine.score().score(), 10);
        assert_eq!(engine.ui().score, "10");

        // Fork tile: one branch is enough
        drive_to(&mut engine, 0, Vec2::new(30.0, 0.0));
        drive_to(&mut engine, 0, Vec2::new(35.0, -3.0));
        assert_eq!(engine.score().score(), 25);
    }

    #[test]
    fn test_lack_of_progress_threshold() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(5.0, 0.0));
        assert_eq!(engine.current_target().map(|t| t.address), Some(S1));

        // distance² = 60: still on track
        drive_to(&mut engine, 0, Vec2::new(5.0, 60.0_f32.sqrt()));
        assert_eq!(engine.phase(), ChallengePhase::Running);
        assert!(engine.current_target().is_some());

        // distance² = 65: lack of progress
        drive_to(&mut engine, 0, Vec2::new(9.0, 7.0));
        assert_eq!(engine.phase(), ChallengePhase::LackOfProgress);
        assert!(engine.current_target().is_none());

        // Paused: timer frozen
        let ticks = engine.timer().tick_count();
        engine.tick(&TickInput::default());
        assert_eq!(engine.timer().tick_count(), ticks);

        // Operator resumes
        engine.tick(&TickInput { pause: true });
        assert_eq!(engine.phase(), ChallengePhase::Running);
    }

    #[test]
    fn test_spawn_ends_lack_of_progress() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(5.0, 0.0));
        drive_to(&mut engine, 0, Vec2::new(5.0, 20.0));
        assert_eq!(engine.phase(), ChallengePhase::LackOfProgress);

        engine.spawn_at(0).unwrap();
        assert_eq!(engine.phase(), ChallengePhase::Running);

        // An operator pause survives a spawn
        engine.set_paused(true);
        engine.spawn_at(0).unwrap();
        assert_eq!(engine.phase(), ChallengePhase::Paused);
    }

    #[test]
    fn test_watchdog_tracks_owning_robot() {
        let mut engine = engine_with(RescueSettings::default(), 2);
        // Move robot 0 off the first waypoint before any contacts are reported
        engine.robot_body_mut(0).unwrap().position = Vec2::new(-100.0, 0.0);
        engine.tick(&TickInput::default());

        drive_to(&mut engine, 1, Vec2::new(5.0, 0.0));
        assert_eq!(engine.current_target().map(|t| t.robot), Some(1));

        // Robot 0 is far from the target; only robot 1 is measured
        engine.tick(&TickInput::default());
        assert_eq!(engine.phase(), ChallengePhase::Running);

        engine.robot_body_mut(1).unwrap().position = Vec2::new(5.0, 20.0);
        engine.tick(&TickInput::default());
        assert_eq!(engine.phase(), ChallengePhase::LackOfProgress);
    }

    #[test]
    fn test_watchdog_idle_while_paused() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(5.0, 0.0));
        engine.set_paused(true);
        engine.robot_body_mut(0).unwrap().position = Vec2::new(100.0, 100.0);
        engine.tick(&TickInput::default());
        assert_eq!(engine.phase(), ChallengePhase::Paused);
        assert!(engine.current_target().is_some());
    }

    #[test]
    fn test_spawn_at() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(30.0, 0.0));
        assert!(engine.current_target().is_some());
        let fork_first = FollowAddress::Single { tile: 1, entry: 0 };
        assert_eq!(engine.tiles()[1].completion.get(fork_first), Some(true));

        engine.spawn_at(1).unwrap();

        assert!(engine.current_target().is_none());
        assert_eq!(engine.tiles()[1].completion.completed_count(), 0);
        let follower = engine.robots()[0].follower;
        assert_eq!(engine.world().position(follower), Some(Vec2::new(30.0, 0.0)));
        assert_eq!(engine.robots()[0].body.position, Vec2::new(30.0, 0.0));
        assert_eq!(engine.robots()[0].body.velocity, Vec2::ZERO);
        assert_eq!(engine.score().touches(), 1);
        assert_eq!(engine.score().score(), -5);
        assert_eq!(engine.ui().fill(fork_first), Some(FOLLOW_POINT_FILL));
    }

    #[test]
    fn test_spawn_onto_touched_waypoint_completes_it_again() {
        let mut engine = engine();
        let fork_first = FollowAddress::Single { tile: 1, entry: 0 };
        drive_to(&mut engine, 0, Vec2::new(30.0, 0.0));
        assert_eq!(engine.tiles()[1].completion.get(fork_first), Some(true));

        // The follower never leaves the waypoint
        engine.spawn_at(1).unwrap();
        assert_eq!(engine.tiles()[1].completion.get(fork_first), Some(false));
        drive_to(&mut engine, 0, Vec2::new(30.0, 0.0));

        assert_eq!(engine.tiles()[1].completion.get(fork_first), Some(true));
        assert_eq!(engine.current_target().map(|t| t.address), Some(fork_first));
    }

    #[test]
    fn test_reset_onto_touched_waypoint_completes_it_again() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(0.0, 0.0));
        assert_eq!(engine.tiles()[0].completion.get(S0), Some(true));

        engine.reset().unwrap();
        drive_to(&mut engine, 0, Vec2::new(0.0, 0.0));
        assert_eq!(engine.tiles()[0].completion.get(S0), Some(true));
    }

    #[test]
    fn test_spawn_out_of_range() {
        let mut engine = engine();
        assert!(matches!(
            engine.spawn_at(7),
            Err(RescueError::TileOutOfRange { index: 7, count: 2 })
        ));
        assert_eq!(engine.score().touches(), 0);
    }

    #[test]
    fn test_full_reset() {
        let mut engine = engine();
        drive_to(&mut engine, 0, Vec2::new(5.0, 0.0));
        engine.touch_bot();
        engine.touch_bot();
        engine.robot_body_mut(0).unwrap().velocity = Vec2::new(3.0, 0.0);
        engine.robot_body_mut(0).unwrap().angular_velocity = 1.0;
        for _ in 0..10 {
            engine.tick(&TickInput::default());
        }

        engine.reset().unwrap();

        assert_eq!(engine.score().score(), 0);
        assert_eq!(engine.score().touches(), 0);
        assert_eq!(engine.score().touch_penalty_accumulated(), 0);
        assert_eq!(engine.timer().tick_count(), 0);
        assert!(engine.current_target().is_none());
        for tile in engine.tiles() {
            assert_eq!(tile.completion.completed_count(), 0);
            assert!(tile.completion.mirrors(&tile.graph));
        }
        let body = engine.robots()[0].body;
        assert_eq!(body, RobotBody::at(Vec2::ZERO, 0.0));
        assert_eq!(engine.ui().timer, "05:00");
        assert_eq!(engine.ui().touches, "0");
        assert_eq!(engine.ui().fill(S1), Some(FOLLOW_POINT_FILL));
    }

    #[test]
    fn test_reset_rearms_checkers() {
        let mut engine = engine();
        for x in [0.0, 5.0, 10.0] {
            drive_to(&mut engine, 0, Vec2::new(x, 0.0));
        }
        assert_eq!(engine.score().score(), 10);
        engine.reset().unwrap();
        for x in [0.0, 5.0, 10.0] {
            drive_to(&mut engine, 0, Vec2::new(x, 0.0));
        }
        assert_eq!(engine.score().score(), 10);
    }

    #[test]
    fn test_timer_frozen_while_paused() {
        let mut engine = engine();
        engine.tick(&TickInput::default());
        assert_eq!(engine.ui().timer, "04:59");

        engine.tick(&TickInput { pause: true });
        engine.tick(&TickInput::default());
        assert_eq!(engine.timer().tick_count(), 1);
        assert_eq!(engine.ui().timer, "04:59");
    }

    #[test]
    fn test_timer_runs_out() {
        let settings = RescueSettings {
            start_time_secs: 1,
            ..Default::default()
        };
        let mut engine = engine_with(settings, 1);
        assert_eq!(engine.ui().timer, "00:01");
        for _ in 0..29 {
            engine.tick(&TickInput::default());
        }
        assert_eq!(engine.phase(), ChallengePhase::Running);
        engine.tick(&TickInput::default());
        assert_eq!(engine.ui().timer, "00:00");
        assert_eq!(engine.phase(), ChallengePhase::TimeUp);

        // Toggling does not leave TimeUp
        engine.tick(&TickInput { pause: true });
        assert_eq!(engine.phase(), ChallengePhase::TimeUp);
        engine.reset().unwrap();
        assert_eq!(engine.phase(), ChallengePhase::Running);
    }

    #[test]
    fn test_timer_continue_clamps_display() {
        let settings = RescueSettings {
            start_time_secs: 1,
            timeout: TimeoutBehavior::Continue,
            ..Default::default()
        };
        let mut engine = engine_with(settings, 1);
        for _ in 0..40 {
            engine.tick(&TickInput::default());
        }
        assert_eq!(engine.phase(), ChallengePhase::Running);
        assert_eq!(engine.ui().timer, "00:00");
    }

    #[test]
    fn test_pointer_reset_and_spawn() {
        let mut engine = engine();
        engine.touch_bot();
        let reset_at = engine.settings().reset_button_position;

        let down = PointerEvent::primary(PointerKind::Down, reset_at);
        assert_eq!(engine.handle_pointer(&down, &Identity).unwrap(), None);
        assert_eq!(engine.ui().reset_icon, ResetIcon::Pressed);
        let up = PointerEvent::primary(PointerKind::Up, reset_at);
        assert_eq!(engine.handle_pointer(&up, &Identity).unwrap(), Some(UiAction::Reset));
        assert_eq!(engine.score().touches(), 0);
        assert_eq!(engine.ui().reset_icon, ResetIcon::Idle);

        let spawn_at = engine.tiles()[1].summary.spawn_button;
        let down = PointerEvent::primary(PointerKind::Down, spawn_at);
        assert_eq!(
            engine.handle_pointer(&down, &Identity).unwrap(),
            Some(UiAction::SpawnAt(1))
        );
        assert_eq!(engine.robots()[0].body.position, Vec2::new(30.0, 0.0));
        assert_eq!(engine.score().touches(), 1);
    }

    #[test]
    fn test_teardown_clears_world() {
        let engine = engine_with(RescueSettings::default(), 2);
        assert!(!engine.world().is_empty());
        let (world, _hud) = engine.teardown();
        assert!(world.is_empty());
    }
}
