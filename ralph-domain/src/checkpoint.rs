// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Per-entity checkpoint persistence (§6): "a per-entity checkpoint blob
//! (the serialized `RalphState` at last iteration) for resume." A
//! JSON-file-backed default — no cloud vendor is named in the spec, so a
//! local, swappable store is the right-sized default (see DESIGN.md).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ralph_core::model::RalphState;

pub trait CheckpointStore: Send + Sync {
    /// # Errors
    /// Returns `Err` with a message when the checkpoint cannot be
    /// persisted.
    fn save(&self, state: &RalphState) -> Result<(), String>;

    /// # Errors
    /// Returns `Err` with a message when a checkpoint exists but cannot be
    /// parsed.
    fn load(&self, entity_id: &str) -> Result<Option<RalphState>, String>;

    /// # Errors
    /// Returns `Err` with a message when the checkpoint cannot be removed.
    fn clear(&self, entity_id: &str) -> Result<(), String>;
}

/// Process-local checkpoint store, used by tests and as the backing for
/// `JsonFileCheckpointStore`'s in-memory mirror.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    states: Mutex<HashMap<String, RalphState>>,
}

impl InMemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&self, state: &RalphState) -> Result<(), String> {
        self.states
            .lock()
            .expect("checkpoint lock poisoned")
            .insert(state.entity_id.clone(), state.clone());
        Ok(())
    }

    fn load(&self, entity_id: &str) -> Result<Option<RalphState>, String> {
        Ok(self.states.lock().expect("checkpoint lock poisoned").get(entity_id).cloned())
    }

    fn clear(&self, entity_id: &str) -> Result<(), String> {
        self.states.lock().expect("checkpoint lock poisoned").remove(entity_id);
        Ok(())
    }
}

/// One JSON file per entity under `base_dir`, named `<entity_id>.json`.
pub struct JsonFileCheckpointStore {
    base_dir: PathBuf,
}

impl JsonFileCheckpointStore {
    /// # Errors
    /// Returns `Err` if `base_dir` does not exist and cannot be created.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, String> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir).map_err(|e| e.to_string())?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, entity_id: &str) -> PathBuf {
        self.base_dir.join(format!("{entity_id}.json"))
    }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn save(&self, state: &RalphState) -> Result<(), String> {
        let json = serde_json::to_string_pretty(state).map_err(|e| e.to_string())?;
        std::fs::write(self.path_for(&state.entity_id), json).map_err(|e| e.to_string())
    }

    fn load(&self, entity_id: &str) -> Result<Option<RalphState>, String> {
        let path = self.path_for(entity_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
        let state: RalphState = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
        Ok(Some(state))
    }

    fn clear(&self, entity_id: &str) -> Result<(), String> {
        let path = self.path_for(entity_id);
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
