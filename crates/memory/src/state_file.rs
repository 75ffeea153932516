//! JSON state persistence.
//!
//! The whole session snapshot lives in one pretty-printed JSON file
//! (default `~/.reverie/state.json`). Loads are best-effort: a missing or
//! unreadable file yields a fresh default state. Saves replace the file
//! atomically by writing a sibling temp file and renaming it over the target.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reverie_core::error::PersistenceError;
use reverie_core::{MoodVector, ObservationRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::self_model::SelfModel;

/// Everything that survives a restart.
///
/// Every field is defaulted so older or partial files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub mood_vector: MoodVector,
    #[serde(default)]
    pub belief_table: BTreeMap<String, f64>,
    #[serde(default)]
    pub observations: Vec<ObservationRecord>,
    #[serde(default)]
    pub motif_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub self_model: SelfModel,
    #[serde(default)]
    pub last_reflection_timestamp: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub session_start: DateTime<Utc>,
    #[serde(default)]
    pub processed_cycles: u64,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            mood_vector: MoodVector::default(),
            belief_table: BTreeMap::new(),
            observations: Vec::new(),
            motif_counts: BTreeMap::new(),
            self_model: SelfModel::default(),
            last_reflection_timestamp: None,
            session_start: Utc::now(),
            processed_cycles: 0,
            saved_at: None,
        }
    }
}

/// A state file at a fixed path.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and parse the file. `Ok(None)` when it does not exist yet.
    pub fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let mut state: PersistedState =
            serde_json::from_str(&content).map_err(|e| PersistenceError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        state.mood_vector = state.mood_vector.clamped();
        if state.session_id.is_empty() {
            state.session_id = Uuid::new_v4().to_string();
        }

        debug!(
            path = %self.path.display(),
            observations = state.observations.len(),
            beliefs = state.belief_table.len(),
            "State file loaded"
        );
        Ok(Some(state))
    }

    /// Like [`load`](Self::load), but never fails: any problem starts a fresh state.
    pub fn load_or_default(&self) -> PersistedState {
        match self.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!(path = %self.path.display(), "No saved state, starting fresh");
                PersistedState::default()
            }
            Err(e) => {
                warn!(error = %e, "Saved state unusable, starting fresh");
                PersistedState::default()
            }
        }
    }

    /// Overwrite the file with `state`.
    pub fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let write_err = |reason: String| PersistenceError::Write {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| write_err(format!("Failed to create state directory: {e}")))?;
            }
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| write_err(format!("Failed to serialize state: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp).map_err(|e| write_err(e.to_string()))?;
        file.write_all(content.as_bytes())
            .map_err(|e| write_err(e.to_string()))?;
        // Contents must be on disk before the rename makes them visible.
        file.sync_all().map_err(|e| write_err(e.to_string()))?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(|e| write_err(e.to_string()))?;

        debug!(path = %self.path.display(), "State file saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PersistedState {
        let mut state = PersistedState {
            mood_vector: MoodVector::new(0.123_456_789, -0.42, 0.77),
            processed_cycles: 12,
            last_reflection_timestamp: Some(Utc::now()),
            ..Default::default()
        };
        state.belief_table.insert("window".into(), 0.35);
        state.belief_table.insert("warm light".into(), 0.812_345);
        state.motif_counts.insert("window".into(), 4);
        state
            .observations
            .push(ObservationRecord::new("a lamp glows", 0.8, Utc::now()));
        state
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("nested").join("state.json"));
        let state = sample_state();

        file.save(&state).unwrap();
        let loaded = file.load().unwrap().unwrap();

        assert!((loaded.mood_vector.valence - state.mood_vector.valence).abs() < 1e-6);
        assert!((loaded.mood_vector.arousal - state.mood_vector.arousal).abs() < 1e-6);
        assert!((loaded.mood_vector.clarity - state.mood_vector.clarity).abs() < 1e-6);
        assert_eq!(loaded.belief_table.len(), state.belief_table.len());
        for (motif, strength) in &state.belief_table {
            assert!((loaded.belief_table[motif] - strength).abs() < 1e-6);
        }
        assert_eq!(loaded.processed_cycles, 12);
        assert_eq!(loaded.observations.len(), 1);
    }

    #[test]
    fn save_is_idempotent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let file = StateFile::new(&path);
        let state = sample_state();

        file.save(&state).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        file.save(&state).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn truncated_temp_file_from_interrupted_save_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(dir.path().join("state.json.tmp"), "{\"mood_vec").unwrap();
        let file = StateFile::new(&path);

        file.save(&sample_state()).unwrap();

        assert!(!dir.path().join("state.json.tmp").exists());
        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.processed_cycles, 12);
        assert_eq!(loaded.motif_counts["window"], 4);
    }

    #[test]
    fn missing_file_is_none_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("absent.json"));
        assert!(file.load().unwrap().is_none());
        let state = file.load_or_default();
        assert_eq!(state.processed_cycles, 0);
        assert!(state.belief_table.is_empty());
    }

    #[test]
    fn corrupt_file_is_parse_error_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let file = StateFile::new(&path);

        assert!(matches!(file.load(), Err(PersistenceError::Parse { .. })));
        let state = file.load_or_default();
        assert_eq!(state.mood_vector, MoodVector::default());
    }

    #[test]
    fn partial_file_fills_defaults_and_clamps_mood() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"mood_vector":{"valence":4.0,"arousal":-9.0,"clarity":0.5}}"#,
        )
        .unwrap();

        let state = StateFile::new(&path).load().unwrap().unwrap();
        assert_eq!(state.mood_vector.valence, 1.0);
        assert_eq!(state.mood_vector.arousal, -1.0);
        assert!(!state.session_id.is_empty());
        assert!(state.observations.is_empty());
    }
}
