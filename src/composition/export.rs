//! JSON export and import of compositions

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::model::Composition;
use super::note::{Accidental, Entry, Note, NoteDuration, Rest, TimeSignature};
use crate::error::{Result, SolfaError};
use crate::hand::Sign;

/// `note` value used for rests.
pub const REST_NAME: &str = "rest";

/// One entry in an exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNote {
    /// Solfege syllable, or `"rest"`.
    pub note: String,
    #[serde(default)]
    pub octave: Option<i32>,
    #[serde(default)]
    pub accidental: Option<Accidental>,
    #[serde(default)]
    pub duration: NoteDuration,
}

/// Exported composition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub name: String,
    pub notes: Vec<ExportNote>,
    pub tempo: u32,
    #[serde(default)]
    pub time_signature: TimeSignature,
    pub exported_at: DateTime<Utc>,
}

impl ExportDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<&Entry> for ExportNote {
    fn from(entry: &Entry) -> Self {
        match entry {
            Entry::Note(n) => ExportNote {
                note: n.pitch.as_str().to_string(),
                octave: Some(n.octave),
                accidental: n.accidental,
                duration: n.duration,
            },
            Entry::Rest(r) => ExportNote {
                note: REST_NAME.to_string(),
                octave: None,
                accidental: None,
                duration: r.duration,
            },
        }
    }
}

impl Composition {
    /// Snapshot the composition as an export document.
    pub fn export_document(&self, name: &str) -> ExportDocument {
        ExportDocument {
            name: name.to_string(),
            notes: self.entries().iter().map(ExportNote::from).collect(),
            tempo: self.tempo(),
            time_signature: self.time_signature(),
            exported_at: Utc::now(),
        }
    }

    /// Replace the note list, tempo and meter with a document's contents.
    ///
    /// The document is validated first; on error the composition is left
    /// untouched. The replacement is one undoable edit.
    pub fn import_document(&mut self, doc: &ExportDocument) -> Result<()> {
        let entries = doc
            .notes
            .iter()
            .map(|n| self.import_entry(n))
            .collect::<Result<Vec<_>>>()?;

        self.replace_entries(entries);
        self.set_tempo(doc.tempo);
        self.set_time_signature(doc.time_signature);
        info!("Imported '{}' ({} entries)", doc.name, doc.notes.len());
        Ok(())
    }

    fn import_entry(&self, n: &ExportNote) -> Result<Entry> {
        if n.note.eq_ignore_ascii_case(REST_NAME) {
            return Ok(Entry::Rest(Rest::new(n.duration)));
        }
        let pitch: Sign = n.note.parse()?;
        let config = self.config();
        let octave = n.octave.unwrap_or(config.default_octave);
        if !(config.min_octave..=config.max_octave).contains(&octave) {
            return Err(SolfaError::InvalidInput {
                reason: format!("octave {} out of range for '{}'", octave, n.note),
            });
        }
        Ok(Entry::Note(Note::new(pitch, octave, n.accidental, n.duration)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Composition {
        let mut composition = Composition::default();
        composition.set_tempo(96);
        composition.set_time_signature(TimeSignature::new(3, 4));
        composition.add_note(Sign::Do, 4, None);
        composition.set_note_duration(NoteDuration::Half);
        composition.add_note(Sign::Fa, 5, Some(Accidental::Sharp));
        composition.add_rest(NoteDuration::Eighth);
        composition.add_note(Sign::Ti, 3, Some(Accidental::Flat));
        composition
    }

    #[test]
    fn test_export_shape() {
        let doc = sample().export_document("Etude");
        let json: serde_json::Value = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["name"], "Etude");
        assert_eq!(json["tempo"], 96);
        assert_eq!(json["timeSignature"], "3/4");
        assert!(json["exportedAt"].is_string());
        assert_eq!(json["notes"][1]["note"], "fa");
        assert_eq!(json["notes"][1]["accidental"], "sharp");
        assert_eq!(json["notes"][2]["note"], "rest");
        assert_eq!(json["notes"][2]["duration"], "eighth");
    }

    #[test]
    fn test_round_trip_field_for_field() {
        let original = sample().export_document("Etude");
        let json = original.to_json_pretty().unwrap();

        let mut restored = Composition::default();
        restored
            .import_document(&ExportDocument::from_json(&json).unwrap())
            .unwrap();
        let mut again = restored.export_document("Etude");
        again.exported_at = original.exported_at;

        assert_eq!(again, original);
    }

    #[test]
    fn test_import_defaults_missing_fields() {
        let json = r#"{"name":"x","notes":[{"note":"sol"}],"tempo":100,"exportedAt":"2024-01-01T00:00:00Z"}"#;
        let mut composition = Composition::default();
        composition
            .import_document(&ExportDocument::from_json(json).unwrap())
            .unwrap();
        let note = composition.notes().next().cloned().unwrap();
        assert_eq!(note.octave, 4);
        assert_eq!(note.duration, NoteDuration::Quarter);
        assert_eq!(composition.time_signature(), TimeSignature::default());
    }

    #[test]
    fn test_bad_import_leaves_composition_untouched() {
        let mut composition = sample();
        let mut doc = composition.export_document("bad");
        doc.notes.push(ExportNote {
            note: "xyz".to_string(),
            octave: Some(4),
            accidental: None,
            duration: NoteDuration::Quarter,
        });
        let err = composition.import_document(&doc).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PITCH_NAME");
        assert_eq!(composition.len(), 4);
    }

    #[test]
    fn test_import_is_undoable() {
        let mut composition = Composition::default();
        composition.add_note(Sign::Re, 4, None);
        let doc = sample().export_document("s");
        composition.import_document(&doc).unwrap();
        assert_eq!(composition.len(), 4);
        composition.undo().unwrap();
        assert_eq!(composition.len(), 1);
    }
}
