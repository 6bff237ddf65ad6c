//! Autosave of compositions to a key-value store
//!
//! A snapshot holds the complete composition state, undo and redo stacks
//! included, plus a SHA-256 checksum of the serialized state. Restoring a
//! missing or damaged snapshot never fails: the caller gets a fresh
//! composition and a status saying why.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::model::{Composition, CompositionState};
use crate::config::{AutosaveConfig, CompositionConfig};
use crate::error::{Result, SolfaError};
use crate::storage::KeyValueStore;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized composition plus integrity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Hex SHA-256 of the JSON-serialized `state`.
    pub checksum: String,
    pub state: CompositionState,
}

impl CompositionSnapshot {
    pub fn capture(composition: &Composition) -> Result<Self> {
        let state = composition.state().clone();
        Ok(Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            checksum: Self::checksum(&state)?,
            state,
        })
    }

    fn checksum(state: &CompositionState) -> Result<String> {
        let content = serde_json::to_vec(state)?;
        Ok(format!("{:x}", Sha256::digest(&content)))
    }

    /// Check version and checksum.
    pub fn verify(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SolfaError::SnapshotCorrupted {
                reason: format!("unsupported snapshot version {}", self.version),
            });
        }
        let actual = Self::checksum(&self.state)?;
        if actual != self.checksum {
            return Err(SolfaError::SnapshotCorrupted {
                reason: "checksum mismatch".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and verify a stored snapshot.
    pub fn decode(raw: &str) -> Result<Self> {
        let snapshot: CompositionSnapshot =
            serde_json::from_str(raw).map_err(|e| SolfaError::SnapshotCorrupted {
                reason: e.to_string(),
            })?;
        snapshot.verify()?;
        Ok(snapshot)
    }
}

/// How a restore went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    Restored,
    /// Nothing stored under the key.
    Missing,
    /// Stored value failed to parse or verify.
    Corrupted(String),
    /// The store itself failed.
    Unavailable(String),
}

/// Periodic autosave bookkeeping.
#[derive(Debug, Clone)]
pub struct AutosaveManager {
    config: AutosaveConfig,
    last_save_ms: Option<u64>,
    last_error: Option<String>,
}

impl AutosaveManager {
    pub fn new(config: AutosaveConfig) -> Self {
        Self {
            config,
            last_save_ms: None,
            last_error: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn interval_ms(&self) -> u64 {
        self.config.interval_ms
    }

    pub fn last_save_ms(&self) -> Option<u64> {
        self.last_save_ms
    }

    /// Message of the most recent failed save, cleared by a successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether an interval has elapsed since the last save.
    pub fn should_autosave(&self, now_ms: u64) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self.last_save_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.config.interval_ms,
        }
    }

    /// Write a snapshot of `composition`.
    pub fn save(
        &mut self,
        store: &mut dyn KeyValueStore,
        composition: &Composition,
        now_ms: u64,
    ) -> Result<()> {
        let result = CompositionSnapshot::capture(composition)
            .and_then(|snapshot| Ok(serde_json::to_string(&snapshot)?))
            .and_then(|json| store.set(&self.config.key, &json));

        match result {
            Ok(()) => {
                self.last_save_ms = Some(now_ms);
                self.last_error = None;
                info!("Autosaved {} entries", composition.len());
                Ok(())
            }
            Err(e) => {
                warn!("Autosave failed: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load the stored snapshot, falling back to a fresh composition.
    pub fn restore(
        &self,
        store: &dyn KeyValueStore,
        config: CompositionConfig,
    ) -> (Composition, RestoreStatus) {
        let raw = match store.get(&self.config.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (Composition::new(config), RestoreStatus::Missing),
            Err(e) => {
                warn!("Autosave store unavailable: {}", e);
                return (
                    Composition::new(config),
                    RestoreStatus::Unavailable(e.to_string()),
                );
            }
        };

        match CompositionSnapshot::decode(&raw) {
            Ok(snapshot) => {
                info!(
                    "Restored autosave from {} ({} entries)",
                    snapshot.saved_at,
                    snapshot.state.entries.len()
                );
                (
                    Composition::from_state(snapshot.state, config),
                    RestoreStatus::Restored,
                )
            }
            Err(e) => {
                warn!("Discarding autosave: {}", e);
                (
                    Composition::new(config),
                    RestoreStatus::Corrupted(e.to_string()),
                )
            }
        }
    }

    /// Remove the stored snapshot.
    pub fn clear(&mut self, store: &mut dyn KeyValueStore) -> Result<()> {
        store.remove(&self.config.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{Accidental, NoteDuration};
    use crate::hand::Sign;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn edited() -> Composition {
        let mut composition = Composition::default();
        composition.add_note(Sign::Do, 4, None);
        composition.add_note(Sign::Re, 4, None);
        composition.undo().unwrap();
        composition.octave_up();
        composition.set_accidental(Some(Accidental::Sharp));
        composition.set_note_duration(NoteDuration::Half);
        composition.set_tempo(150);
        composition
    }

    #[test]
    fn test_restore_brings_back_history() {
        let mut store = MemoryStore::new();
        let mut manager = AutosaveManager::new(AutosaveConfig::default());
        let original = edited();
        manager.save(&mut store, &original, 10_000).unwrap();

        let (mut restored, status) = manager.restore(&store, CompositionConfig::default());
        assert_eq!(status, RestoreStatus::Restored);
        assert_eq!(restored.state(), original.state());

        restored.redo().unwrap();
        assert_eq!(restored.len(), 2);
        restored.undo().unwrap();
        restored.undo().unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_fresh() {
        let store = MemoryStore::new();
        let manager = AutosaveManager::new(AutosaveConfig::default());
        let (composition, status) = manager.restore(&store, CompositionConfig::default());
        assert_eq!(status, RestoreStatus::Missing);
        assert!(composition.is_empty());
    }

    #[test]
    fn test_tampered_snapshot_is_rejected() {
        let mut store = MemoryStore::new();
        let mut manager = AutosaveManager::new(AutosaveConfig::default());
        manager.save(&mut store, &edited(), 0).unwrap();

        let raw = store.get("solfa.autosave").unwrap().unwrap();
        let tampered = raw.replace("\"tempo\":150", "\"tempo\":90");
        assert_ne!(raw, tampered);
        store.set("solfa.autosave", &tampered).unwrap();

        let (composition, status) = manager.restore(&store, CompositionConfig::default());
        assert!(matches!(status, RestoreStatus::Corrupted(_)));
        assert!(composition.is_empty());
        assert_eq!(composition.tempo(), 120);
    }

    #[test]
    fn test_garbage_snapshot_is_rejected() {
        let mut store = MemoryStore::new();
        store.set("solfa.autosave", "not json").unwrap();
        let manager = AutosaveManager::new(AutosaveConfig::default());
        let (_, status) = manager.restore(&store, CompositionConfig::default());
        assert!(matches!(status, RestoreStatus::Corrupted(_)));
    }

    #[test]
    fn test_unavailable_store_reports_error() {
        let mut store = MemoryStore::unavailable();
        let mut manager = AutosaveManager::new(AutosaveConfig::default());
        assert!(manager.save(&mut store, &edited(), 0).is_err());
        assert!(manager.last_error().is_some());
        assert_eq!(manager.last_save_ms(), None);

        let (_, status) = manager.restore(&store, CompositionConfig::default());
        assert!(matches!(status, RestoreStatus::Unavailable(_)));
    }

    #[test]
    fn test_should_autosave_interval() {
        let mut store = MemoryStore::new();
        let mut manager = AutosaveManager::new(AutosaveConfig::default());
        assert!(manager.should_autosave(0));
        manager.save(&mut store, &Composition::default(), 1_000).unwrap();
        assert!(!manager.should_autosave(10_999));
        assert!(manager.should_autosave(11_000));
    }
}
