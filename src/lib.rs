//! Solfa - Hand-Sign Music Composition Core
//!
//! Solfa turns a stream of hand-landmark frames (plus optional voice
//! transcripts) into music:
//! 1. Sign classification - Curwen solfege hand signs and a flat control hand
//! 2. Gesture debouncing - per-hand commit state, zone holds, motion patterns
//! 3. Composition - notes and rests with bounded undo/redo, export, autosave
//! 4. Synthesis - additive oscillator voices, ADSR envelopes, an effects chain
//!
//! # Architecture
//!
//! A [`session::Session`] owns one of everything and is driven one frame at a
//! time. All deferred work runs off virtual clocks (frame milliseconds for
//! the session, samples for the audio engine), so behaviour is deterministic
//! and nothing reads the wall clock for timing.

pub mod audio;
pub mod command;
pub mod composition;
pub mod config;
pub mod error;
pub mod gesture;
pub mod hand;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod voice;

pub use command::{Action, Command};
pub use config::{ConfigHandle, InputMode, SessionConfig};
pub use error::{Result, SolfaError};
pub use session::{Session, SessionEvent, SessionStatus};
