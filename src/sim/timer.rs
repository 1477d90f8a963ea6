//! Countdown timer driven by simulation ticks

use serde::{Deserialize, Serialize};

/// Tick counter plus the countdown it implies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerService {
    tick: u64,
    tick_rate: u32,
    start_secs: u32,
}

impl TimerService {
    pub fn new(start_secs: u32, tick_rate: u32) -> Self {
        Self {
            tick: 0,
            tick_rate: tick_rate.max(1),
            start_secs,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Advance one tick unless paused. Returns whether the clock moved.
    pub fn advance(&mut self, paused: bool) -> bool {
        if paused {
            return false;
        }
        self.tick += 1;
        true
    }

    pub fn reset(&mut self) {
        self.tick = 0;
    }

    /// Whole seconds left, floored, never below zero
    pub fn remaining_secs(&self) -> u64 {
        remaining_secs(self.tick, self.start_secs, self.tick_rate)
    }

    pub fn expired(&self) -> bool {
        self.tick >= u64::from(self.start_secs) * u64::from(self.tick_rate)
    }

    /// `MM:SS`
    pub fn display(&self) -> String {
        format_countdown(self.tick, self.start_secs, self.tick_rate)
    }
}

fn remaining_secs(tick: u64, start_secs: u32, tick_rate: u32) -> u64 {
    let rate = u64::from(tick_rate.max(1));
    let total = u64::from(start_secs) * rate;
    total.saturating_sub(tick) / rate
}

/// Countdown text for `tick` elapsed ticks, clamped at `00:00`
pub fn format_countdown(tick: u64, start_secs: u32, tick_rate: u32) -> String {
    let secs = remaining_secs(tick, start_secs, tick_rate);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
