//! Audio synthesis
//!
//! Notes are oscillator graphs (one oscillator per partial of the timbre)
//! shaped by a sample-accurate ADSR gain automation. Voices mix into a
//! stereo note bus that runs through the effects chain and the master gain
//! before reaching an [`AudioBackend`].

pub mod backend;
pub mod buffer;
pub mod effects;
pub mod engine;
pub mod envelope;
pub mod oscillator;
pub mod pitch;
pub mod render;
pub mod voice;

pub use backend::{AudioBackend, CaptureBackend, CaptureHandle, NullBackend, WavFileBackend};
pub use buffer::{
    calculate_peak, calculate_rms, db_to_linear, linear_to_db, AudioBuffer, ChannelLayout,
};
pub use effects::{create_effect, Effect, EffectChain, EFFECT_TYPES};
pub use engine::{ArpeggioPattern, AudioEngine, ChordType, NoteOptions, SequenceNote, VoiceMode};
pub use envelope::{Adsr, GainAutomation};
pub use oscillator::{Oscillator, Timbre, Waveform};
pub use pitch::{frequency, semitone_frequency, semitone_of};
pub use render::{bounce_composition, bounce_note, render_composition_to_wav};
pub use voice::{AudioVoice, VoiceState};
