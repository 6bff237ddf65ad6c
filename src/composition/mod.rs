//! Composition model: notes, rests, undo history, playback and persistence

pub mod autosave;
pub mod export;
pub mod history;
pub mod model;
pub mod note;
pub mod playback;

pub use autosave::{AutosaveManager, CompositionSnapshot, RestoreStatus};
pub use export::{ExportDocument, ExportNote};
pub use history::{EditKind, History};
pub use model::{Composition, CompositionState};
pub use note::{Accidental, Entry, Note, NoteDuration, Rest, TimeSignature};
pub use playback::PlaybackEvent;
