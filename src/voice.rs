//! Voice transcript interpretation
//!
//! Speech-to-text happens outside the crate. A final transcript is matched
//! against a small fixed vocabulary; the first matching phrase wins, with
//! longer phrases checked before the words they contain.

use crate::command::Command;
use crate::composition::NoteDuration;

/// Map a transcript to a command, or `None` when nothing matches
pub fn parse_transcript(transcript: &str) -> Option<Command> {
    let text = transcript.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    let has_word = |w: &str| text.split(|c: char| !c.is_alphanumeric()).any(|t| t == w);

    if text.contains("add rest") {
        return Some(Command::AddRest);
    }
    for duration in NoteDuration::ALL {
        if text.contains(&format!("{} note", duration.as_str())) {
            return Some(Command::SetDuration(duration));
        }
    }
    if text.contains("octave up") || has_word("higher") {
        return Some(Command::OctaveUp);
    }
    if text.contains("octave down") || has_word("lower") {
        return Some(Command::OctaveDown);
    }

    let words: [(&str, Command); 11] = [
        ("add", Command::AddNote),
        ("play", Command::Play),
        ("stop", Command::Stop),
        ("undo", Command::Undo),
        ("clear", Command::Clear),
        ("reset", Command::Clear),
        ("sharp", Command::Sharp),
        ("flat", Command::Flat),
        ("natural", Command::Natural),
        ("faster", Command::Faster),
        ("slower", Command::Slower),
    ];
    words
        .iter()
        .find(|(word, _)| has_word(word))
        .map(|&(_, command)| command)
}
