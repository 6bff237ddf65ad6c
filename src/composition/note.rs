//! Notes, rests and their musical attributes

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SolfaError;
use crate::hand::Sign;

/// Chromatic alteration of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accidental {
    Sharp,
    Flat,
}

impl Accidental {
    /// Semitone offset applied to the natural pitch.
    pub fn offset(&self) -> i32 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

/// Written note length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteDuration {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
}

impl NoteDuration {
    pub const ALL: [NoteDuration; 4] = [
        NoteDuration::Whole,
        NoteDuration::Half,
        NoteDuration::Quarter,
        NoteDuration::Eighth,
    ];

    /// Length in quarter-note beats.
    pub fn beats(&self) -> f64 {
        match self {
            NoteDuration::Whole => 4.0,
            NoteDuration::Half => 2.0,
            NoteDuration::Quarter => 1.0,
            NoteDuration::Eighth => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteDuration::Whole => "whole",
            NoteDuration::Half => "half",
            NoteDuration::Quarter => "quarter",
            NoteDuration::Eighth => "eighth",
        }
    }
}

impl fmt::Display for NoteDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteDuration {
    type Err = SolfaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        NoteDuration::ALL
            .into_iter()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| SolfaError::InvalidInput {
                reason: format!("unknown note duration '{}'", s),
            })
    }
}

/// Meter, serialized as `"beats/unit"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSignature {
    pub beats_per_bar: u8,
    pub beat_unit: u8,
}

impl TimeSignature {
    pub fn new(beats_per_bar: u8, beat_unit: u8) -> Self {
        Self {
            beats_per_bar,
            beat_unit,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_bar, self.beat_unit)
    }
}

impl FromStr for TimeSignature {
    type Err = SolfaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SolfaError::InvalidInput {
            reason: format!("invalid time signature '{}'", s),
        };
        let (beats, unit) = s.trim().split_once('/').ok_or_else(invalid)?;
        let beats: u8 = beats.trim().parse().map_err(|_| invalid())?;
        let unit: u8 = unit.trim().parse().map_err(|_| invalid())?;
        if beats == 0 || !unit.is_power_of_two() {
            return Err(invalid());
        }
        Ok(Self::new(beats, unit))
    }
}

impl TryFrom<String> for TimeSignature {
    type Error = SolfaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSignature> for String {
    fn from(value: TimeSignature) -> Self {
        value.to_string()
    }
}

/// A pitched note in the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub pitch: Sign,
    pub octave: i32,
    pub accidental: Option<Accidental>,
    pub duration: NoteDuration,
    pub timestamp: DateTime<Utc>,
}

impl Note {
    pub fn new(
        pitch: Sign,
        octave: i32,
        accidental: Option<Accidental>,
        duration: NoteDuration,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pitch,
            octave,
            accidental,
            duration,
            timestamp: Utc::now(),
        }
    }

    /// Pitch name understood by the audio engine, e.g. `"fa"` or `"F#"`.
    pub fn pitch_name(&self) -> String {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        match self.accidental {
            None => self.pitch.as_str().to_string(),
            Some(accidental) => {
                let semitone = (self.pitch.semitone() + accidental.offset()).rem_euclid(12);
                NAMES[semitone as usize].to_string()
            }
        }
    }

    /// Octave actually sounded, after an accidental wraps past B or C.
    pub fn sounding_octave(&self) -> i32 {
        let raw = self.pitch.semitone() + self.accidental.map_or(0, |a| a.offset());
        self.octave + raw.div_euclid(12)
    }
}

/// A silent entry in the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    pub id: String,
    pub duration: NoteDuration,
}

impl Rest {
    pub fn new(duration: NoteDuration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            duration,
        }
    }
}

/// One element of the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entry {
    Note(Note),
    Rest(Rest),
}

impl Entry {
    pub fn id(&self) -> &str {
        match self {
            Entry::Note(n) => &n.id,
            Entry::Rest(r) => &r.id,
        }
    }

    pub fn duration(&self) -> NoteDuration {
        match self {
            Entry::Note(n) => n.duration,
            Entry::Rest(r) => r.duration,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Entry::Note(n) => Some(n),
            Entry::Rest(_) => None,
        }
    }
}
