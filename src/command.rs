//! Editing and transport commands shared by every input modality

use std::fmt;

use serde::Serialize;

use crate::composition::NoteDuration;

/// A discrete user intent, whatever produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum Command {
    /// Append the committed (or last) sign as a note
    AddNote,
    AddRest,
    SetDuration(NoteDuration),
    OctaveUp,
    OctaveDown,
    Play,
    Stop,
    Undo,
    Redo,
    Clear,
    Sharp,
    Flat,
    Natural,
    Faster,
    Slower,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddNote => write!(f, "add note"),
            Command::AddRest => write!(f, "add rest"),
            Command::SetDuration(d) => write!(f, "{} note", d),
            Command::OctaveUp => write!(f, "octave up"),
            Command::OctaveDown => write!(f, "octave down"),
            Command::Play => write!(f, "play"),
            Command::Stop => write!(f, "stop"),
            Command::Undo => write!(f, "undo"),
            Command::Redo => write!(f, "redo"),
            Command::Clear => write!(f, "clear"),
            Command::Sharp => write!(f, "sharp"),
            Command::Flat => write!(f, "flat"),
            Command::Natural => write!(f, "natural"),
            Command::Faster => write!(f, "faster"),
            Command::Slower => write!(f, "slower"),
        }
    }
}

/// A command bound to a control gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Action {
    pub command: Command,
    pub description: &'static str,
}
