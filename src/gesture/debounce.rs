//! Per-channel debounce of sign classifications
//!
//! A sign must be seen on `hold_frames` consecutive confident frames before
//! it commits. Switching to a different sign, dropping below the confidence
//! threshold, or losing the hand all restart the count.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::DebounceConfig;
use crate::hand::{Handedness, Sign, SignClassification};

/// Which hand a channel listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    /// Right hand, sign driven
    Melody,
    /// Left hand, flat-hand plus zone or motion
    Control,
}

impl ChannelRole {
    /// The tracked hand this role reads.
    pub fn hand(self) -> Handedness {
        match self {
            ChannelRole::Melody => Handedness::Right,
            ChannelRole::Control => Handedness::Left,
        }
    }
}

/// Where a channel is in its commit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Idle,
    Candidate,
    Committed,
}

/// Observable state of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelState {
    pub status: ChannelStatus,
    pub candidate_sign: Option<Sign>,
    pub frame_count: u32,
}

/// Side effect requested by a channel transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelEvent {
    NoteOn(Sign),
    NoteOff(Sign),
}

/// Debounce state machine for one hand role
#[derive(Debug, Clone)]
pub struct DebounceChannel {
    role: ChannelRole,
    config: DebounceConfig,
    state: ChannelState,
}

impl DebounceChannel {
    pub fn new(role: ChannelRole, config: DebounceConfig) -> Self {
        Self {
            role,
            config,
            state: ChannelState::default(),
        }
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Sign currently committed on this channel
    pub fn committed(&self) -> Option<Sign> {
        match self.state.status {
            ChannelStatus::Committed => self.state.candidate_sign,
            _ => None,
        }
    }

    /// Feed one frame's classification
    pub fn update(&mut self, classification: &SignClassification) -> Option<ChannelEvent> {
        self.observe(classification.sign, classification.confidence)
    }

    /// Feed one frame's sign and confidence directly
    pub fn observe(&mut self, sign: Option<Sign>, confidence: f32) -> Option<ChannelEvent> {
        match sign {
            Some(sign) if confidence >= self.config.confidence_threshold => self.advance(sign),
            _ => self.reset(),
        }
    }

    /// Drop back to idle, releasing any committed sign.
    ///
    /// Used for sub-threshold frames and when the hand leaves the frame.
    pub fn reset(&mut self) -> Option<ChannelEvent> {
        let released = self.committed();
        self.state = ChannelState::default();
        if let Some(sign) = released {
            info!("{:?} channel released {}", self.role, sign);
        }
        released.map(ChannelEvent::NoteOff)
    }

    fn advance(&mut self, sign: Sign) -> Option<ChannelEvent> {
        let state = self.state;
        match state.status {
            ChannelStatus::Committed if state.candidate_sign == Some(sign) => None,
            ChannelStatus::Candidate if state.candidate_sign == Some(sign) => {
                self.count(sign, state.frame_count + 1)
            }
            ChannelStatus::Idle if state.candidate_sign.map_or(true, |c| c == sign) => {
                self.count(sign, 1)
            }
            _ => {
                let released = self.committed();
                debug!(
                    "{:?} channel switched from {:?} to {}",
                    self.role, state.candidate_sign, sign
                );
                self.state = ChannelState {
                    status: ChannelStatus::Idle,
                    candidate_sign: Some(sign),
                    frame_count: 0,
                };
                released.map(ChannelEvent::NoteOff)
            }
        }
    }

    fn count(&mut self, sign: Sign, frame_count: u32) -> Option<ChannelEvent> {
        if frame_count >= self.config.hold_frames {
            info!("{:?} channel committed {}", self.role, sign);
            self.state = ChannelState {
                status: ChannelStatus::Committed,
                candidate_sign: Some(sign),
                frame_count,
            };
            Some(ChannelEvent::NoteOn(sign))
        } else {
            self.state = ChannelState {
                status: ChannelStatus::Candidate,
                candidate_sign: Some(sign),
                frame_count,
            };
            None
        }
    }
}
