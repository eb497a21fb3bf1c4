// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Scheduler/Orchestrator (§4.12): owns per-entity cost/iteration caps
//! (delegated to the Exploration Loop itself via `RalphConfig`), global
//! concurrency, checkpoint/resume, same-day idempotent caching, and the
//! bounded-retry-then-FAILED semantics for `StoreWriteError`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use ralph_core::config::{ModelTier, RalphConfig};
use ralph_core::llm::LlmProvider;
use ralph_core::model::{Entity, RalphState, ValidatedSignal};
use ralph_core::search::SearchClient;

use ralph_domain::checkpoint::CheckpointStore;
use ralph_domain::exploration::{ExplorationLoop, TerminationReason};
use ralph_domain::priors::{self, Dossier};
use ralph_domain::signal_store::{RetryQueue, SignalStore};

use crate::error::{RuntimeError, RuntimeResult};

/// Structured per-entity run summary (§7 "user-visible failure" shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub entity_id: String,
    pub status: TerminationReason,
    pub iterations: u32,
    pub validated_signal_count: usize,
    pub cost_usd: f64,
    pub reason_if_terminated_early: Option<String>,
    pub ran_on: NaiveDate,
}

impl RunSummary {
    /// CLI exit code for `run` (§6): 0 success, 3 cost cap, 4 iteration
    /// cap; a store-write failure is surfaced as a `RuntimeError` instead
    /// of a summary, so it never reaches this mapping.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            TerminationReason::Completed | TerminationReason::Saturated => 0,
            TerminationReason::CostCap => 3,
            TerminationReason::IterationCap => 4,
            TerminationReason::Failed => 5,
            TerminationReason::Cancelled => 1,
        }
    }
}

/// `export --entity` bundle: the checkpointed state plus every validated
/// signal written so far (§6 persistent state layout).
#[derive(Debug, Serialize)]
pub struct ExportBundle {
    pub state: Option<RalphState>,
    pub signals: Vec<ValidatedSignal>,
}

fn run_record_path(dir: &Path, entity_id: &str) -> PathBuf {
    dir.join(format!("{entity_id}.run.json"))
}

fn load_run_record(dir: &Path, entity_id: &str) -> Option<RunSummary> {
    let path = run_record_path(dir, entity_id);
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn save_run_record(dir: &Path, summary: &RunSummary) -> RuntimeResult<()> {
    std::fs::create_dir_all(dir)?;
    let path = run_record_path(dir, &summary.entity_id);
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Owns the shared resources a batch of entity runs draw from: the search
/// client, the LLM cascade, the Signal Store, and the checkpoint store
/// (§5: the Signal Store is the only shared mutable resource; everything
/// else is per-run).
pub struct Scheduler {
    config: RalphConfig,
    search: Arc<dyn SearchClient>,
    providers: Vec<(ModelTier, Arc<dyn LlmProvider>)>,
    signal_store: Arc<dyn SignalStore>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    run_log_dir: PathBuf,
    concurrency: Arc<Semaphore>,
    store_retry_attempts: u32,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        config: RalphConfig,
        search: Arc<dyn SearchClient>,
        providers: Vec<(ModelTier, Arc<dyn LlmProvider>)>,
        signal_store: Arc<dyn SignalStore>,
        checkpoint_store: Arc<dyn CheckpointStore>,
        run_log_dir: PathBuf,
        concurrency: usize,
        store_retry_attempts: u32,
    ) -> Self {
        Self {
            config,
            search,
            providers,
            signal_store,
            checkpoint_store,
            run_log_dir,
            concurrency: Arc::new(Semaphore::new(concurrency.max(1))),
            store_retry_attempts,
        }
    }

    /// Synchronous entity run: resumes from a checkpoint if one exists,
    /// otherwise seeds fresh (from a dossier if supplied). Blocking because
    /// every component it calls (`SearchClient`, `LlmProvider`) is blocking
    /// (§5: suspension points, not async tasks, within a single-threaded
    /// cooperative loop).
    pub fn run_entity_sync(
        &self,
        entity: &Entity,
        dossier: Option<&Dossier>,
        force: bool,
        resume: bool,
        max_iterations: Option<u32>,
    ) -> RuntimeResult<RunSummary> {
        let today = Utc::now().date_naive();
        if !force {
            if let Some(cached) = load_run_record(&self.run_log_dir, &entity.id) {
                if cached.ran_on == today {
                    info!(entity_id = %entity.id, "using same-day cached run result");
                    return Ok(cached);
                }
            }
        }

        let mut config = self.config.clone();
        if let Some(max_iterations) = max_iterations {
            config.exploration.max_iterations = max_iterations.min(30);
        }

        let resumed = if resume {
            self.checkpoint_store
                .load(&entity.id)
                .map_err(|e| RuntimeError::Config(format!("checkpoint load failed: {e}")))?
        } else {
            None
        };
        let state = resumed.unwrap_or_else(|| match dossier {
            Some(dossier) => priors::seed_state(dossier, config.exploration.absolute_ceiling),
            None => RalphState::new(entity.id.clone(), config.exploration.starting_confidence, config.exploration.absolute_ceiling),
        });

        let providers: Vec<(ModelTier, &dyn LlmProvider)> =
            self.providers.iter().map(|(tier, provider)| (*tier, provider.as_ref())).collect();

        let exploration = ExplorationLoop::new(&config, self.search.as_ref(), &providers, self.signal_store.as_ref());
        let cost = ralph_core::context::CostCounter::default();
        let cancellation = ralph_core::context::CancellationFlag::default();
        let outcome = exploration.run(entity, state, &cost, &cancellation);

        self.checkpoint_store
            .save(&outcome.final_state)
            .map_err(|e| RuntimeError::Config(format!("checkpoint save failed: {e}")))?;
        if outcome.termination_reason == TerminationReason::Completed {
            let _ = self.checkpoint_store.clear(&entity.id);
        }

        let retry_queue = RetryQueue::new(self.store_retry_attempts);
        for signal in &outcome.validated_signals {
            if self.signal_store.upsert_signal(signal).is_err() {
                retry_queue.enqueue(signal.clone());
            }
        }
        let exhausted = retry_queue.drain(self.signal_store.as_ref());
        let status = if exhausted.is_empty() {
            outcome.termination_reason
        } else {
            warn!(entity_id = %entity.id, exhausted = exhausted.len(), "signal store write exhausted retries");
            TerminationReason::Failed
        };

        let summary = RunSummary {
            entity_id: entity.id.clone(),
            status,
            iterations: outcome.final_state.iterations_completed,
            validated_signal_count: outcome.validated_signals.len(),
            cost_usd: cost.total_usd(),
            reason_if_terminated_early: match status {
                TerminationReason::Completed => None,
                other => Some(format!("{other:?}")),
            },
            ran_on: today,
        };

        save_run_record(&self.run_log_dir, &summary)?;

        if status == TerminationReason::Failed {
            return Err(RuntimeError::Ralph(ralph_core::error::RalphError::StoreWriteError {
                signal_id: exhausted.join(","),
                message: "signal store write exhausted retries".to_string(),
            }));
        }

        Ok(summary)
    }

    /// Async wrapper bounding concurrent entity runs to the configured cap
    /// (§5 default: 8) and keeping the blocking work off the async runtime
    /// thread.
    pub async fn run_entity(
        self: Arc<Self>,
        entity: Entity,
        dossier: Option<Dossier>,
        force: bool,
        resume: bool,
        max_iterations: Option<u32>,
    ) -> RuntimeResult<RunSummary> {
        let permit = Arc::clone(&self.concurrency)
            .acquire_owned()
            .await
            .map_err(|e| RuntimeError::Config(e.to_string()))?;
        let scheduler = Arc::clone(&self);
        let result = tokio::task::spawn_blocking(move || {
            scheduler.run_entity_sync(&entity, dossier.as_ref(), force, resume, max_iterations)
        })
        .await
        .map_err(|e| RuntimeError::Config(format!("run task join error: {e}")))?;
        drop(permit);
        result
    }

    /// Runs a batch of entities with the configured concurrency cap;
    /// per-entity failures do not abort the rest of the batch (§4.12:
    /// failure of one entity run is local to that entity). `resume`
    /// mirrors `run --batch`'s `--resume` flag (§6): when `false`, every
    /// entity starts fresh even if a stale checkpoint exists on disk.
    pub async fn run_batch(
        self: Arc<Self>,
        entities: Vec<(Entity, Option<Dossier>)>,
        force: bool,
        resume: bool,
    ) -> Vec<RuntimeResult<RunSummary>> {
        let mut handles = Vec::with_capacity(entities.len());
        for (entity, dossier) in entities {
            let scheduler = Arc::clone(&self);
            handles.push(tokio::spawn(async move { scheduler.run_entity(entity, dossier, force, resume, None).await }));
        }
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(RuntimeError::Config(format!("batch task join error: {e}"))),
            });
        }
        results
    }

    /// `status --run <id>` (§6): the last recorded run summary for an
    /// entity.
    pub fn status(&self, entity_id: &str) -> RuntimeResult<RunSummary> {
        load_run_record(&self.run_log_dir, entity_id)
            .ok_or_else(|| RuntimeError::NotFound(format!("no run recorded for entity {entity_id}")))
    }

    /// `export --entity <id>` (§6): dumps the checkpointed `RalphState`
    /// (if any) plus every validated signal written for the entity.
    pub fn export(&self, entity_id: &str) -> RuntimeResult<ExportBundle> {
        let state = self
            .checkpoint_store
            .load(entity_id)
            .map_err(|e| RuntimeError::Config(format!("checkpoint load failed: {e}")))?;
        let signals = self.signal_store.signals_for_entity(entity_id);
        Ok(ExportBundle { state, signals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralph_provider::{MockProvider, MockResponse, MockSearchClient};
    use ralph_domain::checkpoint::InMemoryCheckpointStore;
    use ralph_domain::signal_store::InMemorySignalStore;

    fn entity() -> Entity {
        Entity { id: "e1".into(), name: "Example FC".into(), entity_type: "club".into(), priority_score: 60 }
    }

    fn scheduler(max_iterations: u32) -> Scheduler {
        let mut config = RalphConfig::default();
        config.exploration.max_iterations = max_iterations;
        config.exploration.max_cost_per_entity_usd = 50.0;
        let search: Arc<dyn SearchClient> = Arc::new(MockSearchClient::new(vec![], vec![]));
        let provider: Arc<dyn LlmProvider> = Arc::new(MockProvider::new(vec![MockResponse::content("irrelevant")]));
        let dir = tempfile::tempdir().unwrap().keep();
        Scheduler::new(
            config,
            search,
            vec![(ModelTier::Small, provider)],
            Arc::new(InMemorySignalStore::new()),
            Arc::new(InMemoryCheckpointStore::new()),
            dir,
            4,
            3,
        )
    }

    #[test]
    fn run_terminates_on_iteration_cap_and_caches_same_day_result() {
        let scheduler = scheduler(2);
        let summary = scheduler.run_entity_sync(&entity(), None, false, true, None).unwrap();
        assert_eq!(summary.status, TerminationReason::IterationCap);
        assert_eq!(summary.exit_code(), 4);

        let cached = scheduler.run_entity_sync(&entity(), None, false, true, None).unwrap();
        assert_eq!(cached.iterations, summary.iterations);
    }

    #[test]
    fn force_bypasses_the_same_day_cache() {
        let scheduler = scheduler(2);
        scheduler.run_entity_sync(&entity(), None, false, true, None).unwrap();
        let forced = scheduler.run_entity_sync(&entity(), None, true, true, None).unwrap();
        assert_eq!(forced.entity_id, "e1");
    }

    #[test]
    fn status_before_any_run_is_not_found() {
        let scheduler = scheduler(2);
        assert!(scheduler.status("never-run").is_err());
    }

    #[test]
    fn export_returns_checkpoint_and_signals_for_entity() {
        let scheduler = scheduler(2);
        scheduler.run_entity_sync(&entity(), None, false, true, None).unwrap();
        let bundle = scheduler.export("e1").unwrap();
        assert!(bundle.signals.is_empty());
        assert!(bundle.state.is_some());
    }
}
