//! Wrist motion patterns on the control hand
//!
//! A rolling window of wrist positions is inspected every frame. A vertical
//! swipe adds a note, a horizontal swipe undoes, and holding the hand well
//! off-centre shifts the octave.

use std::collections::VecDeque;

use log::info;
use serde::{Deserialize, Serialize};

use crate::command::{Action, Command};
use crate::config::MotionConfig;

/// Recognised motion pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPattern {
    VerticalSwipe,
    HorizontalSwipe,
    HoldRight,
    HoldLeft,
}

impl MotionPattern {
    pub fn action(&self) -> Action {
        let (command, description) = match self {
            MotionPattern::VerticalSwipe => (Command::AddNote, "Add current note"),
            MotionPattern::HorizontalSwipe => (Command::Undo, "Undo last note"),
            MotionPattern::HoldRight => (Command::OctaveUp, "Octave up"),
            MotionPattern::HoldLeft => (Command::OctaveDown, "Octave down"),
        };
        Action {
            command,
            description,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at_ms: u64,
    x: f32,
    y: f32,
}

/// Spread of the buffered positions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionStats {
    pub horizontal_range: f32,
    pub vertical_range: f32,
    /// Mean x minus the frame centre
    pub bias: f32,
    pub span_ms: u64,
}

/// Rolling-window motion recogniser for one control channel
#[derive(Debug, Clone)]
pub struct MotionTracker {
    config: MotionConfig,
    samples: VecDeque<Sample>,
    last_triggered_at_ms: Option<u64>,
}

impl MotionTracker {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            samples: VecDeque::new(),
            last_triggered_at_ms: None,
        }
    }

    /// Forget buffered positions. The cooldown clock is kept.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Statistics over the current window, if any samples are buffered
    pub fn stats(&self) -> Option<MotionStats> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;

        let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
        let mut sum_x = 0.0;
        for s in &self.samples {
            min_x = min_x.min(s.x);
            max_x = max_x.max(s.x);
            min_y = min_y.min(s.y);
            max_y = max_y.max(s.y);
            sum_x += s.x;
        }

        Some(MotionStats {
            horizontal_range: max_x - min_x,
            vertical_range: max_y - min_y,
            bias: sum_x / self.samples.len() as f32 - 0.5,
            span_ms: last.at_ms.saturating_sub(first.at_ms),
        })
    }

    /// Advance with the control-hand wrist position, or `None` when the hand
    /// is missing.
    pub fn update(&mut self, now_ms: u64, wrist: Option<(f32, f32)>) -> Option<MotionPattern> {
        let Some((x, y)) = wrist else {
            self.reset();
            return None;
        };

        self.samples.push_back(Sample { at_ms: now_ms, x, y });
        let horizon = now_ms.saturating_sub(self.config.window_ms);
        while self.samples.front().is_some_and(|s| s.at_ms < horizon) {
            self.samples.pop_front();
        }

        let stats = self.stats()?;
        if stats.span_ms < self.config.min_history_ms {
            return None;
        }
        if self
            .last_triggered_at_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.cooldown_ms)
        {
            return None;
        }

        let pattern = self.recognise(&stats)?;
        info!("Motion pattern {:?} recognised", pattern);
        self.last_triggered_at_ms = Some(now_ms);
        self.samples.clear();
        Some(pattern)
    }

    fn recognise(&self, stats: &MotionStats) -> Option<MotionPattern> {
        let c = &self.config;
        if stats.vertical_range >= c.vertical_range && stats.vertical_range > stats.horizontal_range
        {
            Some(MotionPattern::VerticalSwipe)
        } else if stats.horizontal_range >= c.horizontal_range {
            Some(MotionPattern::HorizontalSwipe)
        } else if stats.horizontal_range <= c.bias_max_range && stats.bias > c.bias {
            Some(MotionPattern::HoldRight)
        } else if stats.horizontal_range <= c.bias_max_range && stats.bias < -c.bias {
            Some(MotionPattern::HoldLeft)
        } else {
            None
        }
    }
}
