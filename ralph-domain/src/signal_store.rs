// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Signal Store Gateway (§4.10): write-only from the Exploration
//! Loop's perspective, idempotent on `signal_id`. An in-memory default and
//! a JSON-file-backed variant for process-restart durability, plus the
//! bounded-retry queue §4.12/§7 describe for `StoreWriteError`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ralph_core::model::{canonicalize_claim, Category, ValidatedSignal};

/// Operations the Validation Pipeline and Exploration Loop use. Reads are
/// allowed only for duplicate detection in Pass 4 (§4.10).
pub trait SignalStore: Send + Sync {
    /// # Errors
    /// Returns `Err` with a message when the underlying store is
    /// unreachable; callers route this through the bounded-retry queue.
    fn upsert_signal(&self, signal: &ValidatedSignal) -> Result<(), String>;

    fn already_written(&self, entity_id: &str, category: Category, canonical_claim: &str) -> bool;

    /// All validated signals written for `entity_id`, for CLI/HTTP export
    /// (§6 outbound shape).
    fn signals_for_entity(&self, entity_id: &str) -> Vec<ValidatedSignal>;
}

fn duplicate_key(entity_id: &str, category: Category, canonical_claim: &str) -> String {
    format!("{entity_id}|{category:?}|{canonical_claim}")
}

/// Process-local store, the default for tests and single-process runs.
#[derive(Default)]
pub struct InMemorySignalStore {
    signals: Mutex<HashMap<String, ValidatedSignal>>,
    claim_keys: Mutex<std::collections::HashSet<String>>,
}

impl InMemorySignalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn all(&self) -> Vec<ValidatedSignal> {
        self.signals.lock().expect("store lock poisoned").values().cloned().collect()
    }
}

impl SignalStore for InMemorySignalStore {
    fn upsert_signal(&self, signal: &ValidatedSignal) -> Result<(), String> {
        let canonical = canonicalize_claim(
            &signal
                .verified_evidence
                .first()
                .map(|e| e.extracted_text.clone())
                .unwrap_or_default(),
        );
        self.claim_keys
            .lock()
            .expect("store lock poisoned")
            .insert(duplicate_key(&signal.entity_id, signal.category, &canonical));
        self.signals
            .lock()
            .expect("store lock poisoned")
            .insert(signal.signal_id.clone(), signal.clone());
        Ok(())
    }

    fn already_written(&self, entity_id: &str, category: Category, canonical_claim: &str) -> bool {
        self.claim_keys
            .lock()
            .expect("store lock poisoned")
            .contains(&duplicate_key(entity_id, category, canonical_claim))
    }

    fn signals_for_entity(&self, entity_id: &str) -> Vec<ValidatedSignal> {
        self.signals
            .lock()
            .expect("store lock poisoned")
            .values()
            .filter(|s| s.entity_id == entity_id)
            .cloned()
            .collect()
    }
}

/// JSON-file-backed variant: one file per process, signals appended and
/// rewritten in full on every write (acceptable at this scale; §1
/// Non-goals excludes arbitrary persistent-store writes, not append-only
/// signal persistence).
pub struct JsonFileSignalStore {
    path: PathBuf,
    inner: InMemorySignalStore,
}

impl JsonFileSignalStore {
    /// # Errors
    /// Returns `Err` if an existing file at `path` cannot be parsed as a
    /// JSON array of `ValidatedSignal`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();
        let inner = InMemorySignalStore::new();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
            let signals: Vec<ValidatedSignal> = serde_json::from_str(&contents).map_err(|e| e.to_string())?;
            for signal in &signals {
                inner.upsert_signal(signal)?;
            }
        }
        Ok(Self { path, inner })
    }

    fn flush(&self) -> Result<(), String> {
        let signals = self.inner.all();
        let json = serde_json::to_string_pretty(&signals).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, json).map_err(|e| e.to_string())
    }
}

impl SignalStore for JsonFileSignalStore {
    fn upsert_signal(&self, signal: &ValidatedSignal) -> Result<(), String> {
        self.inner.upsert_signal(signal)?;
        self.flush()
    }

    fn already_written(&self, entity_id: &str, category: Category, canonical_claim: &str) -> bool {
        self.inner.already_written(entity_id, category, canonical_claim)
    }

    fn signals_for_entity(&self, entity_id: &str) -> Vec<ValidatedSignal> {
        self.inner.signals_for_entity(entity_id)
    }
}

/// Bounded-retry queue for `StoreWriteError` (§7, §4.12): records failed
/// writes and replays them against a store, capping attempts before the
/// entity run is marked `FAILED`.
pub struct RetryQueue {
    max_attempts: u32,
    pending: Mutex<Vec<(ValidatedSignal, u32)>>,
}

impl RetryQueue {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, pending: Mutex::new(Vec::new()) }
    }

    pub fn enqueue(&self, signal: ValidatedSignal) {
        self.pending.lock().expect("queue lock poisoned").push((signal, 0));
    }

    /// Replays every pending signal against `store` once. Returns the
    /// signal ids that exhausted their retries without success — callers
    /// treat a non-empty result as `StoreWriteError`, fatal to the run.
    pub fn drain(&self, store: &dyn SignalStore) -> Vec<String> {
        let mut pending = self.pending.lock().expect("queue lock poisoned");
        let mut still_pending = Vec::new();
        let mut exhausted = Vec::new();
        for (signal, attempts) in pending.drain(..) {
            match store.upsert_signal(&signal) {
                Ok(()) => {}
                Err(_) if attempts + 1 < self.max_attempts => still_pending.push((signal, attempts + 1)),
                Err(_) => exhausted.push(signal.signal_id.clone()),
            }
        }
        *pending = still_pending;
        exhausted
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().expect("queue lock poisoned").is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ralph_core::model::{EvidenceItem, PriorityTier, SourceType};

    fn signal(id: &str) -> ValidatedSignal {
        ValidatedSignal {
            signal_id: id.to_string(),
            entity_id: "e1".into(),
            category: Category::Crm,
            confidence_before: 0.7,
            confidence_after: 0.8,
            verified_evidence: vec![EvidenceItem {
                id: "ev1".into(),
                source_type: SourceType::PressRelease,
                url: "https://example.com".into(),
                observed_at: Utc::now(),
                extracted_text: "Example FC evaluating new CRM platform".into(),
                pre_verification_credibility: 0.8,
                post_verification_credibility: 0.8,
                accessible: true,
                content_matches: true,
                verified: true,
            }],
            validation_pass: 3,
            validated_at: Utc::now(),
            temporal_multiplier: 1.0,
            fit_score: 80.0,
            priority_tier: PriorityTier::Tier2,
            primary_reason: None,
            urgency: None,
            requires_manual_review: false,
        }
    }

    #[test]
    fn upsert_is_idempotent_on_signal_id() {
        let store = InMemorySignalStore::new();
        store.upsert_signal(&signal("s1")).unwrap();
        store.upsert_signal(&signal("s1")).unwrap();
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn already_written_detects_duplicate_canonical_claim() {
        let store = InMemorySignalStore::new();
        store.upsert_signal(&signal("s1")).unwrap();
        let canonical = canonicalize_claim("Example FC evaluating new CRM platform");
        assert!(store.already_written("e1", Category::Crm, &canonical));
        assert!(!store.already_written("e1", Category::Analytics, &canonical));
    }

    #[test]
    fn json_file_store_round_trips_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.json");
        {
            let store = JsonFileSignalStore::open(&path).unwrap();
            store.upsert_signal(&signal("s1")).unwrap();
        }
        let reopened = JsonFileSignalStore::open(&path).unwrap();
        assert_eq!(reopened.inner.all().len(), 1);
    }

    #[test]
    fn retry_queue_reports_exhausted_ids_after_max_attempts() {
        struct AlwaysFails;
        impl SignalStore for AlwaysFails {
            fn upsert_signal(&self, _signal: &ValidatedSignal) -> Result<(), String> {
                Err("unreachable".to_string())
            }
            fn already_written(&self, _entity_id: &str, _category: Category, _canonical_claim: &str) -> bool {
                false
            }
            fn signals_for_entity(&self, _entity_id: &str) -> Vec<ValidatedSignal> {
                Vec::new()
            }
        }
        let queue = RetryQueue::new(2);
        queue.enqueue(signal("s1"));
        let first = queue.drain(&AlwaysFails);
        assert!(first.is_empty());
        let second = queue.drain(&AlwaysFails);
        assert_eq!(second, vec!["s1".to_string()]);
        assert!(queue.is_empty());
    }
}
