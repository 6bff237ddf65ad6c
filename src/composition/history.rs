//! Undo/redo history of note-list snapshots
//!
//! Each history entry stores the complete note list as it was before (on the
//! undo stack) or after (on the redo stack) an edit. Stacks are bounded; the
//! oldest entries are dropped first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::note::Entry;
use crate::error::{Result, SolfaError};

/// Default maximum number of undo levels to keep.
pub const DEFAULT_MAX_UNDO_LEVELS: usize = 50;

/// Kinds of edit that are recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    AddNote,
    AddRest,
    Clear,
    Import,
}

impl std::fmt::Display for EditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditKind::AddNote => write!(f, "Add Note"),
            EditKind::AddRest => write!(f, "Add Rest"),
            EditKind::Clear => write!(f, "Clear"),
            EditKind::Import => write!(f, "Import"),
        }
    }
}

/// One recorded note-list snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Edit that moved away from this snapshot.
    pub kind: EditKind,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<Entry>,
}

/// Bounded undo and redo stacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_levels: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_LEVELS)
    }
}

impl History {
    pub fn new(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels: max_levels.max(1),
        }
    }

    /// Record the note list as it was before an edit.
    ///
    /// This clears the redo stack, since the history has diverged.
    pub fn record(&mut self, kind: EditKind, before: Vec<Entry>) {
        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry {
            kind,
            timestamp: Utc::now(),
            entries: before,
        });
        Self::trim(&mut self.undo_stack, self.max_levels);
    }

    /// Swap `current` with the most recent undo snapshot.
    pub fn undo(&mut self, current: &mut Vec<Entry>) -> Result<EditKind> {
        let mut entry = self.undo_stack.pop().ok_or(SolfaError::NothingToUndo)?;
        let kind = entry.kind;
        std::mem::swap(current, &mut entry.entries);
        entry.timestamp = Utc::now();
        self.redo_stack.push(entry);
        Self::trim(&mut self.redo_stack, self.max_levels);
        Ok(kind)
    }

    /// Swap `current` with the most recent redo snapshot.
    pub fn redo(&mut self, current: &mut Vec<Entry>) -> Result<EditKind> {
        let mut entry = self.redo_stack.pop().ok_or(SolfaError::NothingToRedo)?;
        let kind = entry.kind;
        std::mem::swap(current, &mut entry.entries);
        entry.timestamp = Utc::now();
        self.undo_stack.push(entry);
        Self::trim(&mut self.undo_stack, self.max_levels);
        Ok(kind)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Kind of the edit the next `undo` would revert.
    pub fn peek_undo(&self) -> Option<EditKind> {
        self.undo_stack.last().map(|e| e.kind)
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    fn trim(stack: &mut Vec<HistoryEntry>, max: usize) {
        if stack.len() > max {
            let excess = stack.len() - max;
            stack.drain(0..excess);
        }
    }
}
