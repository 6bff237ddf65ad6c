//! The mutable composition
//!
//! Only edits to the note list are recorded in the undo history. Octave,
//! accidental, duration and tempo are editing context and change freely.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::history::{EditKind, History};
use super::note::{Accidental, Entry, Note, NoteDuration, Rest, TimeSignature};
use crate::config::CompositionConfig;
use crate::error::Result;
use crate::hand::Sign;

/// Serializable contents of a composition, history included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionState {
    pub entries: Vec<Entry>,
    pub current_octave: i32,
    pub current_accidental: Option<Accidental>,
    pub current_duration: NoteDuration,
    pub tempo: u32,
    pub time_signature: TimeSignature,
    pub history: History,
}

/// Ordered notes and rests plus editing context and undo history.
#[derive(Debug, Clone)]
pub struct Composition {
    state: CompositionState,
    config: CompositionConfig,
}

impl Default for Composition {
    fn default() -> Self {
        Self::new(CompositionConfig::default())
    }
}

impl Composition {
    pub fn new(config: CompositionConfig) -> Self {
        let state = CompositionState {
            entries: Vec::new(),
            current_octave: config.default_octave,
            current_accidental: None,
            current_duration: NoteDuration::default(),
            tempo: config.default_tempo,
            time_signature: config.time_signature,
            history: History::new(config.max_history),
        };
        Self { state, config }
    }

    /// Rebuild from a saved state. Octave and tempo are re-clamped to `config`.
    pub fn from_state(mut state: CompositionState, config: CompositionConfig) -> Self {
        state.current_octave = state
            .current_octave
            .clamp(config.min_octave, config.max_octave);
        state.tempo = state.tempo.clamp(config.min_tempo, config.max_tempo);
        Self { state, config }
    }

    pub fn state(&self) -> &CompositionState {
        &self.state
    }

    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    pub fn entries(&self) -> &[Entry] {
        &self.state.entries
    }

    /// Notes only, rests skipped.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.state.entries.iter().filter_map(Entry::as_note)
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    pub fn current_octave(&self) -> i32 {
        self.state.current_octave
    }

    pub fn current_accidental(&self) -> Option<Accidental> {
        self.state.current_accidental
    }

    pub fn current_duration(&self) -> NoteDuration {
        self.state.current_duration
    }

    pub fn tempo(&self) -> u32 {
        self.state.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.state.time_signature
    }

    pub fn history(&self) -> &History {
        &self.state.history
    }

    pub fn can_undo(&self) -> bool {
        self.state.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state.history.can_redo()
    }

    fn record(&mut self, kind: EditKind) {
        let before = self.state.entries.clone();
        self.state.history.record(kind, before);
    }

    /// Append a note with the current duration. The octave is clamped.
    pub fn add_note(
        &mut self,
        pitch: Sign,
        octave: i32,
        accidental: Option<Accidental>,
    ) -> Note {
        self.record(EditKind::AddNote);
        let octave = octave.clamp(self.config.min_octave, self.config.max_octave);
        let note = Note::new(pitch, octave, accidental, self.state.current_duration);
        info!(
            "Added note {}{} (octave {}, {})",
            pitch,
            accidental.map_or("", |a| match a {
                Accidental::Sharp => "#",
                Accidental::Flat => "b",
            }),
            octave,
            note.duration
        );
        self.state.entries.push(Entry::Note(note.clone()));
        note
    }

    /// Append a note using the current octave and accidental.
    pub fn add_sign(&mut self, pitch: Sign) -> Note {
        let octave = self.state.current_octave;
        let accidental = self.state.current_accidental;
        self.add_note(pitch, octave, accidental)
    }

    pub fn add_rest(&mut self, duration: NoteDuration) -> Rest {
        self.record(EditKind::AddRest);
        debug!("Added {} rest", duration);
        let rest = Rest::new(duration);
        self.state.entries.push(Entry::Rest(rest.clone()));
        rest
    }

    /// Duration used by subsequently added notes.
    pub fn set_note_duration(&mut self, duration: NoteDuration) {
        self.state.current_duration = duration;
    }

    /// Set the octave for subsequent notes, clamped to the configured range.
    pub fn set_octave(&mut self, octave: i32) -> i32 {
        self.state.current_octave = octave.clamp(self.config.min_octave, self.config.max_octave);
        self.state.current_octave
    }

    pub fn octave_up(&mut self) -> i32 {
        self.set_octave(self.state.current_octave + 1)
    }

    pub fn octave_down(&mut self) -> i32 {
        self.set_octave(self.state.current_octave - 1)
    }

    /// Accidental for subsequent notes; stays until set back to `None`.
    pub fn set_accidental(&mut self, accidental: Option<Accidental>) {
        self.state.current_accidental = accidental;
    }

    /// Set the tempo in BPM, clamped to the configured range.
    pub fn set_tempo(&mut self, bpm: u32) -> u32 {
        self.state.tempo = bpm.clamp(self.config.min_tempo, self.config.max_tempo);
        self.state.tempo
    }

    pub fn faster(&mut self) -> u32 {
        self.set_tempo(self.state.tempo.saturating_add(self.config.tempo_step))
    }

    pub fn slower(&mut self) -> u32 {
        self.set_tempo(self.state.tempo.saturating_sub(self.config.tempo_step))
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.state.time_signature = time_signature;
    }

    /// Restore the note list from before the last recorded edit.
    pub fn undo(&mut self) -> Result<()> {
        let kind = self.state.history.undo(&mut self.state.entries)?;
        debug!("Undid {}", kind);
        Ok(())
    }

    /// Re-apply the last undone edit.
    pub fn redo(&mut self) -> Result<()> {
        let kind = self.state.history.redo(&mut self.state.entries)?;
        debug!("Redid {}", kind);
        Ok(())
    }

    /// Remove every entry. Recorded, so it can be undone.
    pub fn clear(&mut self) {
        self.record(EditKind::Clear);
        self.state.entries.clear();
        info!("Composition cleared");
    }

    /// Replace the note list wholesale (recorded as one edit).
    pub(crate) fn replace_entries(&mut self, entries: Vec<Entry>) {
        self.record(EditKind::Import);
        self.state.entries = entries;
    }
}
