//! Session configuration
//!
//! Configuration is an immutable snapshot. [`ConfigHandle`] hands out
//! `Arc<SessionConfig>` and replaces the whole snapshot on update, so a reader
//! holding an `Arc` never sees a half-applied change.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::{Adsr, Timbre, VoiceMode};
use crate::composition::TimeSignature;
use crate::error::{Result, SolfaError};

/// Thresholds for the geometric sign / flat-hand classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// A finger with an extension ratio below this is curled
    pub curled_max: f32,
    /// A finger with an extension ratio above this is extended
    pub extended_min: f32,
    /// Thumb extension above this counts as an extended thumb
    pub thumb_extended_min: f32,
    /// Every finger (thumb included) must reach this for a flat hand
    pub flat_extension_min: f32,
    /// Minimum palm facing score for a flat hand
    pub flat_facing_min: f32,
    /// Maximum palm tilt (degrees from the camera axis) for a flat hand
    pub flat_tilt_max_deg: f32,
    /// Minimum normalized finger spread for a flat hand
    pub flat_spread_min: f32,
    /// Minimum bounding-box area (normalized frame units) for a flat hand
    pub flat_area_min: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            curled_max: 0.65,
            extended_min: 0.85,
            thumb_extended_min: 0.8,
            flat_extension_min: 0.85,
            flat_facing_min: 0.7,
            flat_tilt_max_deg: 35.0,
            flat_spread_min: 0.25,
            flat_area_min: 0.01,
        }
    }
}

/// Per-channel debounce settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Minimum classifier confidence for a frame to count
    pub confidence_threshold: f32,
    /// Consecutive agreeing frames required to commit
    pub hold_frames: u32,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            hold_frames: 12,
        }
    }
}

/// Zone residency control settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Time a flat hand must stay in one zone to complete a hold
    pub hold_ms: u64,
    /// Minimum time between two fired actions on one channel
    pub cooldown_ms: u64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            hold_ms: 3000,
            cooldown_ms: 2000,
        }
    }
}

/// Motion pattern control settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Length of the rolling wrist-position window
    pub window_ms: u64,
    /// History required before anything is classified
    pub min_history_ms: u64,
    /// Vertical range that counts as an add/confirm stroke
    pub vertical_range: f32,
    /// Horizontal range that counts as an undo swipe
    pub horizontal_range: f32,
    /// Offset of the mean x from frame centre that counts as a sustained bias
    pub bias: f32,
    /// A biased hand must stay within this horizontal range
    pub bias_max_range: f32,
    /// Minimum time between two fired actions
    pub cooldown_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            window_ms: 2000,
            min_history_ms: 500,
            vertical_range: 0.25,
            horizontal_range: 0.30,
            bias: 0.2,
            bias_max_range: 0.1,
            cooldown_ms: 2000,
        }
    }
}

/// Composition limits and defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub min_octave: i32,
    pub max_octave: i32,
    pub default_octave: i32,
    pub default_tempo: u32,
    pub min_tempo: u32,
    pub max_tempo: u32,
    /// BPM change applied by `faster` / `slower`
    pub tempo_step: u32,
    /// Undo history depth
    pub max_history: usize,
    /// Fraction of a note's beat length that actually sounds on playback
    pub gate_fraction: f64,
    pub time_signature: TimeSignature,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            min_octave: 2,
            max_octave: 6,
            default_octave: 4,
            default_tempo: 120,
            min_tempo: 40,
            max_tempo: 240,
            tempo_step: 10,
            max_history: 50,
            gate_fraction: 0.8,
            time_signature: TimeSignature::default(),
        }
    }
}

/// Audio engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Master output gain (linear, 0-1)
    pub master_volume: f32,
    /// Peak level reached by a note envelope (linear, 0-1)
    pub note_peak: f32,
    pub envelope: Adsr,
    pub timbre: Timbre,
    pub voice_mode: VoiceMode,
    /// Delay between the end of a release and disposal of the voice graph
    pub dispose_grace_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            master_volume: 0.7,
            note_peak: 0.3,
            envelope: Adsr::default(),
            timbre: Timbre::default(),
            voice_mode: VoiceMode::Polyphonic,
            dispose_grace_ms: 50,
        }
    }
}

/// Autosave settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    /// Key the snapshot is written under
    pub key: String,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 10_000,
            key: "solfa.autosave".to_string(),
        }
    }
}

/// Which input modalities drive the session besides the melody hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Melody hand only; commands come from the API
    HandOnly,
    /// Melody hand plus voice transcripts
    HandVoice,
    /// Melody hand plus flat-hand zone residency on the control hand
    #[default]
    HandZones,
    /// Melody hand plus wrist motion patterns on the control hand
    HandMotion,
}

/// Complete configuration snapshot for a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub input_mode: InputMode,
    /// Append every committed melody sign to the composition
    pub record_commits: bool,
    pub classifier: ClassifierConfig,
    pub debounce: DebounceConfig,
    pub zones: ZoneConfig,
    pub motion: MotionConfig,
    pub composition: CompositionConfig,
    pub audio: AudioConfig,
    pub autosave: AutosaveConfig,
}

impl SessionConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(SolfaError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.debounce.hold_frames == 0 {
            return invalid("debounce.hold_frames must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.debounce.confidence_threshold) {
            return invalid("debounce.confidence_threshold must be within 0..=1");
        }
        if self.classifier.curled_max >= self.classifier.extended_min {
            return invalid("classifier.curled_max must be below classifier.extended_min");
        }
        if self.zones.hold_ms == 0 {
            return invalid("zones.hold_ms must be positive");
        }
        if self.motion.window_ms < self.motion.min_history_ms {
            return invalid("motion.window_ms must cover motion.min_history_ms");
        }

        let c = &self.composition;
        if c.min_octave > c.max_octave {
            return invalid("composition.min_octave exceeds composition.max_octave");
        }
        if !(c.min_octave..=c.max_octave).contains(&c.default_octave) {
            return invalid("composition.default_octave is outside the octave range");
        }
        if c.min_tempo == 0 || c.min_tempo > c.max_tempo {
            return invalid("composition tempo range is empty");
        }
        if !(c.min_tempo..=c.max_tempo).contains(&c.default_tempo) {
            return invalid("composition.default_tempo is outside the tempo range");
        }
        if c.max_history == 0 {
            return invalid("composition.max_history must be at least 1");
        }
        if !(c.gate_fraction > 0.0 && c.gate_fraction <= 1.0) {
            return invalid("composition.gate_fraction must be within (0, 1]");
        }

        if self.audio.sample_rate < 8000 {
            return invalid("audio.sample_rate must be at least 8000 Hz");
        }
        if self.autosave.enabled && self.autosave.interval_ms == 0 {
            return invalid("autosave.interval_ms must be positive");
        }
        Ok(())
    }
}

/// Owner of the current configuration snapshot
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    current: Arc<SessionConfig>,
}

impl ConfigHandle {
    /// Wrap a validated configuration
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            current: Arc::new(config),
        })
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<SessionConfig> {
        Arc::clone(&self.current)
    }

    /// Build a new snapshot from the current one.
    ///
    /// On validation failure the current snapshot is left untouched.
    pub fn update(&mut self, change: impl FnOnce(&mut SessionConfig)) -> Result<Arc<SessionConfig>> {
        let mut next = (*self.current).clone();
        change(&mut next);
        next.validate()?;
        self.current = Arc::new(next);
        Ok(self.snapshot())
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self {
            current: Arc::new(SessionConfig::default()),
        }
    }
}
