//! Zone residency control
//!
//! The frame is split into a 3x3 grid. Holding a flat control hand inside one
//! zone for `hold_ms` completes a hold; a completed hold fires the zone's
//! action unless the channel is still cooling down from its previous trigger.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::command::{Action, Command};
use crate::config::ZoneConfig;

/// One cell of the 3x3 control grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Zone {
    /// Row-major order
    pub const ALL: [Zone; 9] = [
        Zone::TopLeft,
        Zone::Top,
        Zone::TopRight,
        Zone::Left,
        Zone::Center,
        Zone::Right,
        Zone::BottomLeft,
        Zone::Bottom,
        Zone::BottomRight,
    ];

    /// Zone containing a normalized position. Out-of-frame positions clamp
    /// to the nearest edge zone.
    pub fn at(x: f32, y: f32) -> Zone {
        fn band(v: f32) -> usize {
            if v < 1.0 / 3.0 {
                0
            } else if v < 2.0 / 3.0 {
                1
            } else {
                2
            }
        }
        Zone::ALL[band(y) * 3 + band(x)]
    }

    /// Static binding of zone to action
    pub fn action(&self) -> Action {
        let (command, description) = match self {
            Zone::TopLeft => (Command::Sharp, "Sharp"),
            Zone::Top => (Command::OctaveUp, "Octave up"),
            Zone::TopRight => (Command::Flat, "Flat"),
            Zone::Left => (Command::Undo, "Undo last note"),
            Zone::Center => (Command::Play, "Play composition"),
            Zone::Right => (Command::AddNote, "Add current note"),
            Zone::BottomLeft => (Command::Clear, "Clear composition"),
            Zone::Bottom => (Command::OctaveDown, "Octave down"),
            Zone::BottomRight => (Command::Stop, "Stop playback"),
        };
        Action {
            command,
            description,
        }
    }
}

/// Hold bookkeeping for one control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HoldState {
    pub zone: Option<Zone>,
    /// `None` while not holding
    pub hold_start_ms: Option<u64>,
    pub last_triggered_at_ms: Option<u64>,
}

/// What happened on one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneUpdate {
    pub zone: Option<Zone>,
    /// Hold progress in 0..=1
    pub progress: f32,
    pub fired: Option<Action>,
}

/// Tracks flat-hand residency and fires zone actions
#[derive(Debug, Clone)]
pub struct ZoneTracker {
    config: ZoneConfig,
    state: HoldState,
}

impl ZoneTracker {
    pub fn new(config: ZoneConfig) -> Self {
        Self {
            config,
            state: HoldState::default(),
        }
    }

    pub fn state(&self) -> HoldState {
        self.state
    }

    /// Abandon the current hold. The cooldown clock is kept.
    pub fn reset(&mut self) {
        self.state.zone = None;
        self.state.hold_start_ms = None;
    }

    /// Advance with the palm centre of a flat control hand, or `None` when
    /// the hand is missing or not flat.
    pub fn update(&mut self, now_ms: u64, position: Option<(f32, f32)>) -> ZoneUpdate {
        let Some((x, y)) = position else {
            self.reset();
            return ZoneUpdate {
                zone: None,
                progress: 0.0,
                fired: None,
            };
        };

        let zone = Zone::at(x, y);
        let start = match self.state.hold_start_ms {
            Some(start) if self.state.zone == Some(zone) => start,
            _ => {
                if self.state.zone.is_some() && self.state.zone != Some(zone) {
                    debug!("Control hand moved to {:?}, hold restarted", zone);
                }
                self.state.zone = Some(zone);
                self.state.hold_start_ms = Some(now_ms);
                now_ms
            }
        };

        let elapsed = now_ms.saturating_sub(start);
        let progress = (elapsed as f32 / self.config.hold_ms as f32).min(1.0);
        if progress < 1.0 {
            return ZoneUpdate {
                zone: Some(zone),
                progress,
                fired: None,
            };
        }

        self.state.hold_start_ms = Some(now_ms);
        let cooled = self
            .state
            .last_triggered_at_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= self.config.cooldown_ms);

        let fired = if cooled {
            self.state.last_triggered_at_ms = Some(now_ms);
            let action = zone.action();
            info!("Zone {:?} fired: {}", zone, action.description);
            Some(action)
        } else {
            debug!("Zone {:?} hold completed during cooldown", zone);
            None
        };

        ZoneUpdate {
            zone: Some(zone),
            progress,
            fired,
        }
    }
}
