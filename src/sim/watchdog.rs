//! Lack-of-progress detection
//!
//! Purely spatial: the run stalls when the tracked follower drifts further
//! than the allowed distance from its current target. There is no time component.

use glam::Vec2;

/// Result of one watchdog check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatchdogVerdict {
    /// Paused, or no current target
    Idle,
    OnTrack,
    LackOfProgress { distance_sq: f32 },
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressWatchdog {
    max_dist_sq: f32,
}

impl ProgressWatchdog {
    pub fn new(max_follow_dist: f32) -> Self {
        Self {
            max_dist_sq: max_follow_dist * max_follow_dist,
        }
    }

    pub fn max_dist_sq(&self) -> f32 {
        self.max_dist_sq
    }

    /// Compare the follower position against the current target
    pub fn check(&self, paused: bool, target: Option<Vec2>, follower: Vec2) -> WatchdogVerdict {
        let Some(target) = target else {
            return WatchdogVerdict::Idle;
        };
        if paused {
            return WatchdogVerdict::Idle;
        }
        let distance_sq = follower.distance_squared(target);
        if distance_sq > self.max_dist_sq {
            WatchdogVerdict::LackOfProgress { distance_sq }
        } else {
            WatchdogVerdict::OnTrack
        }
    }
}
