//! Error handling for Solfa
//!
//! Classifier input problems are not errors (they come back as tagged
//! zero-confidence classifications). Everything that can genuinely fail at a
//! library boundary is a [`SolfaError`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Solfa operations
pub type Result<T> = std::result::Result<T, SolfaError>;

/// Main error type for Solfa operations
#[derive(Error, Debug)]
pub enum SolfaError {
    // Input Errors
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Unknown pitch name: {name}")]
    UnknownPitchName { name: String },

    // Audio Errors
    #[error("Audio backend unavailable: {backend}: {reason}")]
    AudioBackendUnavailable { backend: String, reason: String },

    #[error("Audio engine used before initialization")]
    AudioNotInitialized,

    #[error("Effect not found: {effect_id}")]
    EffectNotFound { effect_id: String },

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    // Composition Errors
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    // Storage Errors
    #[error("Storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    #[error("Snapshot corrupted: {reason}")]
    SnapshotCorrupted { reason: String },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SolfaError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SolfaError::InvalidInput { .. } => "INVALID_INPUT",
            SolfaError::UnknownPitchName { .. } => "UNKNOWN_PITCH_NAME",
            SolfaError::AudioBackendUnavailable { .. } => "AUDIO_BACKEND_UNAVAILABLE",
            SolfaError::AudioNotInitialized => "AUDIO_NOT_INITIALIZED",
            SolfaError::EffectNotFound { .. } => "EFFECT_NOT_FOUND",
            SolfaError::InvalidParameter { .. } => "INVALID_PARAMETER",
            SolfaError::NothingToUndo => "NOTHING_TO_UNDO",
            SolfaError::NothingToRedo => "NOTHING_TO_REDO",
            SolfaError::StorageUnavailable { .. } => "STORAGE_UNAVAILABLE",
            SolfaError::SnapshotCorrupted { .. } => "SNAPSHOT_CORRUPTED",
            SolfaError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            SolfaError::InvalidConfig { .. } => "INVALID_CONFIG",
            SolfaError::Io(_) => "IO_ERROR",
            SolfaError::Wav(_) => "WAV_ERROR",
            SolfaError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can carry on (possibly in a degraded mode)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SolfaError::InvalidInput { .. }
                | SolfaError::UnknownPitchName { .. }
                | SolfaError::AudioBackendUnavailable { .. }
                | SolfaError::AudioNotInitialized
                | SolfaError::NothingToUndo
                | SolfaError::NothingToRedo
                | SolfaError::StorageUnavailable { .. }
                | SolfaError::SnapshotCorrupted { .. }
        )
    }

    /// Returns a user-facing recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            SolfaError::AudioBackendUnavailable { .. } => {
                Some("Retry initialization or continue without sound.")
            }
            SolfaError::AudioNotInitialized => Some("Initialize the audio engine first."),
            SolfaError::UnknownPitchName { .. } => {
                Some("Use a solfege syllable (do, re, mi...) or a note name (C, C#, Db...).")
            }
            SolfaError::NothingToUndo => Some("There are no changes to undo."),
            SolfaError::NothingToRedo => Some("There are no undone changes to redo."),
            SolfaError::StorageUnavailable { .. } => {
                Some("Your work is still in memory; export it to keep a copy.")
            }
            SolfaError::SnapshotCorrupted { .. } => {
                Some("The autosave could not be read; starting from an empty composition.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SolfaError::UnknownPitchName {
            name: "xyz".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_PITCH_NAME");
        assert_eq!(err.to_string(), "Unknown pitch name: xyz");
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = SolfaError::AudioBackendUnavailable {
            backend: "null".to_string(),
            reason: "device busy".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());

        let err = SolfaError::InvalidConfig {
            reason: "hold_frames must be > 0".to_string(),
        };
        assert!(!err.is_recoverable());
        assert!(err.recovery_suggestion().is_none());
    }
}
