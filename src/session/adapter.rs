//! Control adapters
//!
//! Every input modality drives the same session core. An adapter turns the
//! control hand (or a transcript) into at most one [`Action`] per call; the
//! session executes it. One adapter per [`InputMode`].

use log::debug;

use crate::command::{Action, Command};
use crate::config::{InputMode, SessionConfig};
use crate::gesture::{MotionTracker, Zone, ZoneTracker};
use crate::hand::{Classifier, Hand};
use crate::voice::parse_transcript;

/// What the control channel did on one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlUpdate {
    pub fired: Option<Action>,
    /// Zone being held and progress towards firing, when the adapter has one
    pub hold: Option<(Zone, f32)>,
}

/// Turns one input modality into commands
pub trait ControlAdapter: Send {
    fn mode(&self) -> InputMode;

    /// Feed the control hand for one frame
    fn on_frame(&mut self, now_ms: u64, control: Option<&Hand>, classifier: &Classifier)
        -> ControlUpdate;

    /// Feed a final voice transcript. Only voice adapters act on it.
    fn on_transcript(&mut self, _transcript: &str) -> Option<Command> {
        None
    }

    /// Forget any in-progress gesture
    fn reset(&mut self) {}
}

/// Build the adapter for a configuration's input mode
pub fn adapter_for(config: &SessionConfig) -> Box<dyn ControlAdapter> {
    match config.input_mode {
        InputMode::HandOnly => Box::new(HandOnlyAdapter),
        InputMode::HandVoice => Box::new(VoiceAdapter),
        InputMode::HandZones => Box::new(ZoneAdapter::new(ZoneTracker::new(config.zones.clone()))),
        InputMode::HandMotion => {
            Box::new(MotionAdapter::new(MotionTracker::new(config.motion.clone())))
        }
    }
}

/// Melody hand only; the control hand is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct HandOnlyAdapter;

impl ControlAdapter for HandOnlyAdapter {
    fn mode(&self) -> InputMode {
        InputMode::HandOnly
    }

    fn on_frame(&mut self, _now_ms: u64, _control: Option<&Hand>, _classifier: &Classifier) -> ControlUpdate {
        ControlUpdate::default()
    }
}

/// Commands from speech transcripts.
///
/// Whether the host recogniser is present is tracked on the session status;
/// the adapter only interprets what it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceAdapter;

impl ControlAdapter for VoiceAdapter {
    fn mode(&self) -> InputMode {
        InputMode::HandVoice
    }

    fn on_frame(&mut self, _now_ms: u64, _control: Option<&Hand>, _classifier: &Classifier) -> ControlUpdate {
        ControlUpdate::default()
    }

    fn on_transcript(&mut self, transcript: &str) -> Option<Command> {
        let command = parse_transcript(transcript);
        if command.is_none() {
            debug!("No command in transcript {:?}", transcript);
        }
        command
    }
}

/// Flat control hand held in a grid zone
#[derive(Debug, Clone)]
pub struct ZoneAdapter {
    tracker: ZoneTracker,
}

impl ZoneAdapter {
    pub fn new(tracker: ZoneTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &ZoneTracker {
        &self.tracker
    }
}

impl ControlAdapter for ZoneAdapter {
    fn mode(&self) -> InputMode {
        InputMode::HandZones
    }

    fn on_frame(&mut self, now_ms: u64, control: Option<&Hand>, classifier: &Classifier) -> ControlUpdate {
        let position = control.and_then(|hand| {
            let classification = classifier.classify(Some(hand));
            if classification.flat_hand.is_flat_hand {
                let centre = hand.palm_center();
                Some((centre.x, centre.y))
            } else {
                None
            }
        });

        let update = self.tracker.update(now_ms, position);
        ControlUpdate {
            fired: update.fired,
            hold: update.zone.map(|zone| (zone, update.progress)),
        }
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }
}

/// Wrist motion patterns of the control hand
#[derive(Debug, Clone)]
pub struct MotionAdapter {
    tracker: MotionTracker,
}

impl MotionAdapter {
    pub fn new(tracker: MotionTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &MotionTracker {
        &self.tracker
    }
}

impl ControlAdapter for MotionAdapter {
    fn mode(&self) -> InputMode {
        InputMode::HandMotion
    }

    fn on_frame(&mut self, now_ms: u64, control: Option<&Hand>, _classifier: &Classifier) -> ControlUpdate {
        // malformed hands count as missing
        let wrist = control
            .filter(|hand| hand.validate().is_ok())
            .map(|hand| {
                let wrist = hand.point(0);
                (wrist.x, wrist.y)
            });
        ControlUpdate {
            fired: self.tracker.update(now_ms, wrist).map(|pattern| pattern.action()),
            hold: None,
        }
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoneConfig;
    use crate::hand::fixtures::{closed_fist, flat_hand_at};
    use crate::hand::Handedness;
    use crate::hand::Landmark;

    fn zone_adapter() -> ZoneAdapter {
        ZoneAdapter::new(ZoneTracker::new(ZoneConfig {
            hold_ms: 1000,
            cooldown_ms: 2000,
        }))
    }

    #[test]
    fn test_adapter_per_mode() {
        for mode in [
            InputMode::HandOnly,
            InputMode::HandVoice,
            InputMode::HandZones,
            InputMode::HandMotion,
        ] {
            let config = SessionConfig {
                input_mode: mode,
                ..SessionConfig::default()
            };
            assert_eq!(adapter_for(&config).mode(), mode);
        }
    }

    #[test]
    fn test_zone_adapter_fires_on_flat_hold() {
        let mut adapter = zone_adapter();
        let classifier = Classifier::default();
        let hand = flat_hand_at(Handedness::Left, 0.85, 0.5);

        let first = adapter.on_frame(0, Some(&hand), &classifier);
        assert_eq!(first.hold, Some((Zone::Right, 0.0)));
        assert!(first.fired.is_none());

        let done = adapter.on_frame(1000, Some(&hand), &classifier);
        assert_eq!(done.fired.map(|a| a.command), Some(Command::AddNote));
    }

    #[test]
    fn test_zone_adapter_ignores_fist() {
        let mut adapter = zone_adapter();
        let classifier = Classifier::default();
        let fist = closed_fist(Handedness::Left);
        for t in (0..=2000).step_by(100) {
            let update = adapter.on_frame(t, Some(&fist), &classifier);
            assert!(update.fired.is_none());
            assert!(update.hold.is_none());
        }
    }

    #[test]
    fn test_voice_adapter_parses_transcripts() {
        let mut adapter = VoiceAdapter;
        assert_eq!(adapter.on_transcript("octave up"), Some(Command::OctaveUp));
        assert_eq!(adapter.on_transcript("hello there"), None);
        assert_eq!(adapter.on_transcript("redo"), None);
    }

    #[test]
    fn test_non_voice_adapters_ignore_transcripts() {
        assert_eq!(HandOnlyAdapter.on_transcript("play"), None);
        assert_eq!(zone_adapter().on_transcript("play"), None);
    }

    #[test]
    fn test_motion_adapter_treats_malformed_hand_as_missing() {
        let mut adapter = MotionAdapter::new(MotionTracker::new(Default::default()));
        let broken = Hand::new(vec![Landmark::new(0.5, 0.5, 0.0); 3], Handedness::Left);
        let update = adapter.on_frame(0, Some(&broken), &Classifier::default());
        assert!(update.fired.is_none());
        assert!(adapter.tracker().is_empty());
    }
}
