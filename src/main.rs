//! Rescue Sim entry point
//!
//! Runs a headless demo: one robot drives the embedded four-tile line with a
//! noisy heading while the engine scores it. Usage:
//!
//! ```text
//! rescue-sim [settings.json] [challenge-dir]
//! ```

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use rescue_sim::config::{ChallengeConfig, DocumentSource, FsDocuments, InMemoryDocuments};
    use rescue_sim::sim::{
        ChallengePhase, CheckerRegistry, FollowAddress, RescueEngine, RobotBody, SensorSpace,
        SensorWorld, TickInput,
    };
    use rescue_sim::ui::{HudRecorder, PointerEvent, PointerKind, UiAction, ViewportTransform};
    use rescue_sim::{RescueSettings, Result};

    const CHALLENGE: &str = "challenge.yaml";
    const SEED: u64 = 0x5245_5343;
    /// World units per second
    const DRIVE_SPEED: f32 = 20.0;
    /// Heading noise (radians)
    const JITTER: f32 = 0.25;
    /// Waypoint considered reached by the driver
    const ARRIVE_DIST: f32 = 1.0;
    /// The operator puts the robot back on the fork once
    const TOUCH_AT_TICK: u64 = 150;

    fn embedded_documents() -> InMemoryDocuments {
        InMemoryDocuments::new()
            .with(CHALLENGE, include_str!("../demos/challenge.yaml"))
            .with("tiles/straight.yaml", include_str!("../demos/tiles/straight.yaml"))
            .with("tiles/fork.yaml", include_str!("../demos/tiles/fork.yaml"))
            .with("tiles/corner.yaml", include_str!("../demos/tiles/corner.yaml"))
            .with("ui/summary.yaml", include_str!("../demos/ui/summary.yaml"))
    }

    /// Waypoints the driver aims for: every single point, first branch at forks
    fn route(engine: &RescueEngine) -> Vec<(FollowAddress, Vec2)> {
        engine
            .tiles()
            .iter()
            .flat_map(|tile| tile.graph.addresses())
            .filter(|(address, _)| !matches!(address, FollowAddress::Multi { branch, .. } if *branch != 0))
            .collect()
    }

    fn world_to_screen(view: &ViewportTransform, world: Vec2) -> Vec2 {
        let d = (world - view.world_center) / view.scale;
        view.screen_size / 2.0 + Vec2::new(d.x, -d.y)
    }

    pub fn run() -> Result<()> {
        let mut args = std::env::args().skip(1);
        let settings = match args.next() {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .map_err(|source| rescue_sim::RescueError::Io { path, source })?;
                RescueSettings::from_json(&json)?
            }
            None => RescueSettings::default(),
        };
        let docs: Box<dyn DocumentSource> = match args.next() {
            Some(dir) => Box::new(FsDocuments::new([dir])),
            None => Box::new(embedded_documents()),
        };

        let config = ChallengeConfig::load(docs.as_ref(), CHALLENGE)?;
        let mut engine = RescueEngine::new(
            settings,
            &config,
            docs.as_ref(),
            &CheckerRegistry::default(),
            vec![RobotBody::default()],
            SensorSpace::new(),
            HudRecorder::new(),
        )?;

        let view = ViewportTransform {
            screen_size: Vec2::new(800.0, 600.0),
            scale: 0.4,
            world_center: Vec2::new(45.0, 0.0),
        };
        let route = route(&engine);
        let dt = 1.0 / engine.settings().tick_rate as f32;
        let mut rng = Pcg32::seed_from_u64(SEED);
        let mut next = 0;
        let mut resume = false;
        let mut touched = false;
        let settings = engine.settings();
        let max_ticks = 2 * u64::from(settings.start_time_secs) * u64::from(settings.tick_rate);

        log::info!("Driving {} waypoints", route.len());

        while next < route.len() && engine.phase() != ChallengePhase::TimeUp {
            let tick = engine.timer().tick_count();
            if tick >= max_ticks {
                break;
            }

            // Needs a second tile to put the robot back on
            if !touched && tick >= TOUCH_AT_TICK && engine.tiles().len() > 1 {
                touched = true;
                let button = engine.tile(1)?.summary.spawn_button;
                let click = PointerEvent::primary(PointerKind::Down, world_to_screen(&view, button));
                if let Some(UiAction::SpawnAt(tile)) = engine.handle_pointer(&click, &view)? {
                    next = route.iter().position(|(a, _)| a.tile() == tile).unwrap_or(next);
                }
            }

            if !engine.is_paused() {
                let target = route[next].1;
                let body = engine.robot_body_mut(0)?;
                let to_target = target - body.position;
                if to_target.length() <= ARRIVE_DIST {
                    next += 1;
                } else {
                    let heading = to_target.y.atan2(to_target.x) + rng.random_range(-JITTER..JITTER);
                    let step = (DRIVE_SPEED * dt).min(to_target.length());
                    body.angle = heading;
                    body.velocity = Vec2::from_angle(heading) * DRIVE_SPEED;
                    body.position += Vec2::from_angle(heading) * step;
                }
            }

            let follower = engine.robots()[0].follower;
            let position = engine.robots()[0].body.position;
            engine.world_mut().set_position(follower, position);
            let contacts = engine.world_mut().step();
            engine.after_physics(&contacts)?;

            engine.tick(&TickInput { pause: resume });
            resume = false;

            if engine.is_paused() && engine.phase() != ChallengePhase::TimeUp {
                // Operator steps in and resumes next tick
                log::info!("{:?} at tick {tick}, resuming", engine.phase());
                resume = true;
            }
        }

        let hud = engine.ui();
        log::info!(
            "Finished: time {} score {} touches {} ({})",
            hud.timer,
            hud.score,
            hud.touches,
            hud.touch_penalty
        );
        for tile in engine.tiles() {
            log::info!(
                "Tile {}: {}/{} follow points",
                tile.index,
                tile.completion.completed_count(),
                tile.graph.point_count()
            );
        }

        let (world, _) = engine.teardown();
        log::debug!("{} sensors left after teardown", world.len());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Rescue Sim (native) starting...");

    if let Err(e) = demo::run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Embedders drive the engine directly; nothing to run here
}
