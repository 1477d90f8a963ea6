//! Score and touch penalties
//!
//! A touch is an operator intervention on a robot. Each one costs
//! `touch_penalty`, but the sum of all touch penalties is capped.

use serde::{Deserialize, Serialize};

use crate::ui::UiSink;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEngine {
    score: i64,
    touches: u32,
    touch_penalty_accumulated: i64,
    touch_penalty: i64,
    max_touch_penalty: i64,
}

impl ScoreEngine {
    pub fn new(touch_penalty: i64, max_touch_penalty: i64) -> Self {
        Self {
            score: 0,
            touches: 0,
            touch_penalty_accumulated: 0,
            touch_penalty,
            max_touch_penalty,
        }
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn touches(&self) -> u32 {
        self.touches
    }

    pub fn touch_penalty_accumulated(&self) -> i64 {
        self.touch_penalty_accumulated
    }

    /// Assign the absolute score and refresh the display
    pub fn set_score(&mut self, value: i64, ui: &mut dyn UiSink) {
        self.score = value;
        ui.set_score_text(&self.score.to_string());
    }

    pub fn increment_score(&mut self, amount: i64, ui: &mut dyn UiSink) {
        self.set_score(self.score + amount, ui);
    }

    pub fn decrement_score(&mut self, amount: i64, ui: &mut dyn UiSink) {
        self.set_score(self.score - amount, ui);
    }

    /// Apply one touch. Returns the penalty actually charged.
    pub fn touch_bot(&mut self, ui: &mut dyn UiSink) -> i64 {
        let penalty = self
            .touch_penalty
            .min(self.max_touch_penalty - self.touch_penalty_accumulated)
            .max(0);
        self.decrement_score(penalty, ui);
        self.touch_penalty_accumulated += penalty;
        self.touches += 1;
        self.touches_changed(ui);
        penalty
    }

    /// Push touch count and (negative) accumulated penalty to the HUD
    pub fn touches_changed(&self, ui: &mut dyn UiSink) {
        ui.set_touches_text(&self.touches.to_string());
        ui.set_touch_penalty_text(&(-self.touch_penalty_accumulated).to_string());
    }

    /// Zero everything and refresh the display
    pub fn reset(&mut self, ui: &mut dyn UiSink) {
        self.touches = 0;
        self.touch_penalty_accumulated = 0;
        self.set_score(0, ui);
        self.touches_changed(ui);
    }
}
