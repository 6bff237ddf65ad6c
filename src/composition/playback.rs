//! Derivation of timed playback events from a composition

use serde::{Deserialize, Serialize};

use super::model::Composition;
use super::note::Note;

/// One note to sound during playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    pub note_id: String,
    /// Name accepted by the audio engine's pitch lookup.
    pub pitch_name: String,
    pub octave: i32,
    /// Offset from the start of playback.
    pub start_ms: f64,
    /// Audible length after gating.
    pub duration_ms: f64,
}

impl PlaybackEvent {
    fn from_note(note: &Note, start_ms: f64, duration_ms: f64) -> Self {
        Self {
            note_id: note.id.clone(),
            pitch_name: note.pitch_name(),
            octave: note.sounding_octave(),
            start_ms,
            duration_ms,
        }
    }
}

impl Composition {
    /// Length of one beat at the current tempo.
    pub fn beat_ms(&self) -> f64 {
        60_000.0 / f64::from(self.tempo().max(1))
    }

    /// Timed note events. Rests produce no event but advance time.
    pub fn playback_sequence(&self) -> Vec<PlaybackEvent> {
        let beat_ms = self.beat_ms();
        let gate = self.config().gate_fraction;
        let mut cursor_beats = 0.0;
        let mut events = Vec::new();

        for entry in self.entries() {
            let beats = entry.duration().beats();
            if let Some(note) = entry.as_note() {
                events.push(PlaybackEvent::from_note(
                    note,
                    cursor_beats * beat_ms,
                    gate * beats * beat_ms,
                ));
            }
            cursor_beats += beats;
        }
        events
    }

    /// Time from the first entry's start to the last entry's end.
    pub fn total_duration_ms(&self) -> f64 {
        let beats: f64 = self.entries().iter().map(|e| e.duration().beats()).sum();
        beats * self.beat_ms()
    }
}

#[cfg(test)]
mod tests {
    use crate::composition::{Composition, NoteDuration};
    use crate::hand::Sign;
    use approx::assert_relative_eq;

    #[test]
    fn test_sequence_timing() {
        let mut composition = Composition::default();
        composition.add_note(Sign::Do, 4, None);
        composition.set_note_duration(NoteDuration::Half);
        composition.add_note(Sign::Re, 4, None);
        composition.add_rest(NoteDuration::Quarter);
        composition.set_note_duration(NoteDuration::Eighth);
        composition.add_note(Sign::Mi, 4, None);

        let events = composition.playback_sequence();
        assert_eq!(events.len(), 3);

        // 120 BPM: 500 ms per beat
        assert_relative_eq!(events[0].start_ms, 0.0);
        assert_relative_eq!(events[0].duration_ms, 400.0);
        assert_relative_eq!(events[1].start_ms, 500.0);
        assert_relative_eq!(events[1].duration_ms, 800.0);
        // the rest advances time by one beat
        assert_relative_eq!(events[2].start_ms, 2000.0);
        assert_relative_eq!(events[2].duration_ms, 200.0);
        assert_relative_eq!(composition.total_duration_ms(), 2250.0);
    }

    #[test]
    fn test_tempo_scales_timing() {
        let mut composition = Composition::default();
        composition.set_tempo(60);
        composition.add_note(Sign::Sol, 4, None);
        composition.add_note(Sign::La, 4, None);
        let events = composition.playback_sequence();
        assert_relative_eq!(events[1].start_ms, 1000.0);
        assert_relative_eq!(events[1].duration_ms, 800.0);
    }

    #[test]
    fn test_empty_composition_has_no_events() {
        assert!(Composition::default().playback_sequence().is_empty());
    }
}
