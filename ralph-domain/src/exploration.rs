// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Exploration Loop (§4.9): per-entity driver that iterates hop →
//! evidence → decision → confidence update → early-stop check → (on
//! threshold) validation. Every external call (search, LLM, URL
//! verification) is a suspension point; everything else here is
//! synchronous.

use serde::{Deserialize, Serialize};

use ralph_core::config::{ModelTier, RalphConfig};
use ralph_core::confidence::{self, Alignment, Novelty};
use ralph_core::hop;
use ralph_core::llm::{self, LlmProvider, LlmRequest};
use ralph_core::model::{
    Category, Decision, Entity, EvidenceItem, Hypothesis, RalphState, SignalCandidate,
    ValidatedSignal,
};
use ralph_core::rubric;
use ralph_core::search::SearchClient;

use crate::fit::FitInputs;
use crate::signal_store::SignalStore;
use crate::temporal::{self, HistoricalEvent};
use crate::validation;

/// Per-entity run state machine (§4.9): `INITIALIZING → EXPLORING →
/// (VALIDATING ↔ EXPLORING)* → TERMINATED{...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Initializing,
    Exploring,
    Validating,
    Terminated(TerminationReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    Completed,
    CostCap,
    IterationCap,
    Saturated,
    Failed,
    /// Cooperative cancellation requested (§5) and observed at a
    /// suspension point before the next external call.
    Cancelled,
}

/// Outcome of a full entity run, handed back to the Scheduler.
#[derive(Debug)]
pub struct ExplorationOutcome {
    pub final_state: RalphState,
    pub validated_signals: Vec<ValidatedSignal>,
    pub run_state: RunState,
    pub termination_reason: TerminationReason,
}

#[derive(Debug, Deserialize)]
struct EvidenceExtraction {
    extracted_text: String,
    #[serde(default)]
    pre_verification_credibility: f64,
}

/// Ties the Hop Planner, Decision Rubric, Confidence Engine, and
/// Validation Pipeline into the sequential state machine the Exploration
/// Loop executes for one entity at a time (§5: single-threaded
/// cooperative within a run).
pub struct ExplorationLoop<'a> {
    pub config: &'a RalphConfig,
    pub search: &'a dyn SearchClient,
    pub providers: &'a [(ModelTier, &'a dyn LlmProvider)],
    pub signal_store: &'a dyn SignalStore,
}

impl<'a> ExplorationLoop<'a> {
    #[must_use]
    pub fn new(
        config: &'a RalphConfig,
        search: &'a dyn SearchClient,
        providers: &'a [(ModelTier, &'a dyn LlmProvider)],
        signal_store: &'a dyn SignalStore,
    ) -> Self {
        Self { config, search, providers, signal_store }
    }

    /// Runs the full loop for `entity`, starting from `state` (freshly
    /// seeded or resumed from a checkpoint). `cancellation` is checked at
    /// every suspension point (search, fetch, LLM call) — (§5).
    pub fn run(
        &self,
        entity: &Entity,
        mut state: RalphState,
        cost_tracker: &ralph_core::context::CostCounter,
        cancellation: &ralph_core::context::CancellationFlag,
    ) -> ExplorationOutcome {
        let mut validated_signals = Vec::new();

        let termination = loop {
            if cancellation.is_cancelled() {
                break TerminationReason::Cancelled;
            }
            if cost_tracker.total_usd() >= self.config.exploration.max_cost_per_entity_usd {
                break TerminationReason::CostCap;
            }
            if state.iterations_completed >= self.config.exploration.max_iterations {
                break TerminationReason::IterationCap;
            }

            let early_stop_ceiling = self.config.exploration.absolute_ceiling.min(0.85);
            if state.confidence >= early_stop_ceiling.min(state.confidence_ceiling) {
                break TerminationReason::Completed;
            }
            if state.global_saturated {
                break TerminationReason::Saturated;
            }
            if state.has_stalled() {
                break TerminationReason::Completed;
            }

            let category = self.pick_active_category(&state);
            let Some(category) = category else {
                break TerminationReason::Completed;
            };

            let reinforcement_count = state
                .active_hypotheses()
                .into_iter()
                .find(|h| h.category == category)
                .map_or(0, |h| h.reinforcement_count);

            let Some(source_type) = hop::pick_next_channel(reinforcement_count, &self.config.source_types, &state.blacklist) else {
                break TerminationReason::Saturated;
            };

            let queries = hop::query_templates(&entity.name, source_type);
            let mut search_response = None;
            for query in &queries {
                if cancellation.is_cancelled() {
                    break;
                }
                let response = self.search.search(query, "web", 3);
                cost_tracker.add(response.cost_usd);
                if !response.results.is_empty() {
                    search_response = Some(response);
                    break;
                }
            }

            let Some(search_response) = search_response else {
                state.blacklist.record_failure(source_type);
                state.iterations_completed += 1;
                continue;
            };

            let mut channel_made_progress = false;
            for result in search_response.results.iter().take(1) {
                if cancellation.is_cancelled() {
                    break;
                }
                let evidence = self.extract_evidence(result, cost_tracker);
                let Some(evidence) = evidence else { continue };

                let category_state = state.category_stats_mut(category).clone();
                let (decision, _reason) =
                    rubric::classify(&evidence, &category_state, &state.seen_evidences, entity, &self.config.keywords);

                state.seen_evidences.insert(EvidenceItem::fingerprint(&evidence.extracted_text));

                match decision {
                    Decision::Accept | Decision::WeakAccept => {
                        state.blacklist.record_success(source_type);
                        channel_made_progress = true;
                    }
                    Decision::Reject | Decision::NoProgress => {
                        state.blacklist.record_failure(source_type);
                    }
                    Decision::Saturated => {}
                }

                let novelty = if decision == Decision::Reject || decision == Decision::NoProgress {
                    Novelty::Duplicate
                } else {
                    Novelty::New
                };
                let alignment = if rubric::is_future_action(&evidence, &self.config.keywords) {
                    Alignment::Predictive
                } else {
                    Alignment::Neutral
                };

                confidence::update_state(
                    &mut state,
                    category,
                    decision,
                    novelty,
                    alignment,
                    self.config.exploration.weak_only_ceiling,
                );

                self.update_hypotheses(&mut state, entity, category, decision, &evidence);

                if decision == Decision::Accept || decision == Decision::WeakAccept {
                    state.category_evidence.entry(category).or_default().push(evidence.clone());
                }

                let adjusted_threshold = 0.70 / temporal_multiplier_estimate();
                if state.confidence >= adjusted_threshold {
                    if let Some(signal) = self.try_validate(entity, category, &state) {
                        validated_signals.push(signal);
                    }
                }
            }

            if !channel_made_progress {
                state.blacklist.record_failure(source_type);
            }

            state.iterations_completed += 1;
        };

        ExplorationOutcome {
            final_state: state,
            validated_signals,
            run_state: RunState::Terminated(termination),
            termination_reason: termination,
        }
    }

    /// Routes an ACCEPT/WEAK_ACCEPT decision through the Hypothesis Store
    /// (§4.4) instead of pushing a raw, unmanaged record: an existing
    /// active hypothesis in the category is reinforced (lifecycle: "reinforced
    /// on ACCEPT"); otherwise a new one is added, which enforces the
    /// category-diversity rule (retire-oldest at a third active hypothesis).
    /// A category that has just turned saturated retires its hypotheses
    /// ("retired when its category is SATURATED").
    fn update_hypotheses(
        &self,
        state: &mut RalphState,
        entity: &Entity,
        category: Category,
        decision: Decision,
        evidence: &EvidenceItem,
    ) {
        match decision {
            Decision::Accept => {
                let existing = state
                    .active_hypotheses()
                    .into_iter()
                    .find(|h| h.category == category)
                    .map(|h| h.id.clone());
                if let Some(id) = existing {
                    state.hypothesis_store.reinforce(&id);
                } else {
                    state.hypothesis_store.add(hypothesis_from_evidence(entity, category, evidence));
                }
            }
            Decision::WeakAccept => {
                state.hypothesis_store.add(hypothesis_from_evidence(entity, category, evidence));
            }
            Decision::Reject | Decision::NoProgress | Decision::Saturated => {}
        }

        if state.category_stats_mut(category).is_saturated() {
            let saturated_ids: Vec<String> = state
                .active_hypotheses()
                .into_iter()
                .filter(|h| h.category == category)
                .map(|h| h.id.clone())
                .collect();
            for id in saturated_ids {
                state.hypothesis_store.retire(&id, "category saturated");
            }
        }
    }

    fn pick_active_category(&self, state: &RalphState) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| !state.categories.get(c).is_some_and(ralph_core::model::CategoryStats::is_saturated))
    }

    fn extract_evidence(&self, result: &ralph_core::search::SearchResultItem, cost_tracker: &ralph_core::context::CostCounter) -> Option<EvidenceItem> {
        let prompt = format!(
            "Extract a short evidence excerpt from this search result and estimate its pre-verification credibility (0-1).\nTitle: {}\nSnippet: {}\n\nReturn JSON: {{\"extracted_text\": <string>, \"pre_verification_credibility\": <0-1>}}",
            result.title, result.snippet
        );
        let request = LlmRequest::new(prompt, 256).expecting_schema();
        let response = llm::query_with_cascade(&request, self.providers).ok()?;
        cost_tracker.add(response.cost_usd);
        let extraction: EvidenceExtraction = serde_json::from_str(response.content.trim()).ok()?;

        Some(EvidenceItem {
            id: EvidenceItem::fingerprint(&result.url),
            source_type: ralph_core::model::SourceType::TechNews,
            url: result.url.clone(),
            observed_at: chrono::Utc::now(),
            extracted_text: extraction.extracted_text,
            pre_verification_credibility: extraction.pre_verification_credibility.clamp(0.0, 1.0),
            post_verification_credibility: 0.0,
            accessible: false,
            content_matches: false,
            verified: false,
        })
    }

    fn try_validate(&self, entity: &Entity, category: Category, state: &RalphState) -> Option<ValidatedSignal> {
        let corroborating = state.category_evidence.get(&category)?;
        if corroborating.len() < 3 {
            return None;
        }
        let candidate = SignalCandidate {
            candidate_id: format!("{}-{}-{:?}", entity.id, state.iterations_completed, category),
            entity_id: entity.id.clone(),
            category,
            evidence: corroborating.clone(),
            raw_confidence: state.confidence,
            temporal_multiplier: 1.0,
            primary_reason: Some("confidence threshold crossed".to_string()),
            validated: false,
            validation_pass: 0,
        };

        let provider = self.providers.first().map(|(_, p)| *p)?;
        let history: Vec<HistoricalEvent> = Vec::new();
        let multiplier = temporal::temporal_multiplier(&history, 90.0, 45.0, 20.0, &self.config.temporal);
        let mut candidate = candidate;
        candidate.temporal_multiplier = multiplier;

        validation::validate(
            candidate,
            &[],
            self.search,
            provider,
            self.signal_store,
            &self.config.source_types,
            &self.config.thresholds,
            &entity.name,
            &self.config.keywords.future_action,
            FitInputs { service_match: 0.7, budget_fit: 0.5, timeline_fit: 0.5, entity_size_fit: 0.5, geography_fit: 0.5 },
        )
        .ok()
        .filter(|signal| self.signal_store.upsert_signal(signal).is_ok())
    }
}

fn temporal_multiplier_estimate() -> f64 {
    1.0
}

fn hypothesis_from_evidence(entity: &Entity, category: Category, evidence: &EvidenceItem) -> Hypothesis {
    Hypothesis::new(
        EvidenceItem::fingerprint(&evidence.extracted_text),
        entity.id.clone(),
        category,
        evidence.extracted_text.clone(),
        evidence.pre_verification_credibility.clamp(0.0, 1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralph_core::context::CostCounter;
    use ralph_core::search::{FetchResponse, SearchResponse, SearchResultItem, SearchStatus};
    use ralph_provider::{MockProvider, MockResponse, MockSearchClient};
    use crate::signal_store::InMemorySignalStore;

    fn entity() -> Entity {
        Entity { id: "e1".into(), name: "Example FC".into(), entity_type: "club".into(), priority_score: 60 }
    }

    #[test]
    fn loop_terminates_on_iteration_cap_with_no_search_results() {
        let mut config = RalphConfig::default();
        config.exploration.max_iterations = 3;
        let search = MockSearchClient::new(vec![], vec![]);
        let provider = MockProvider::new(vec![MockResponse::content("irrelevant")]);
        let providers: Vec<(ModelTier, &dyn LlmProvider)> = vec![(ModelTier::Small, &provider)];
        let store = InMemorySignalStore::new();
        let exploration = ExplorationLoop::new(&config, &search, &providers, &store);
        let state = RalphState::new("e1", 0.20, 0.95);
        let cost = CostCounter::default();
        let outcome = exploration.run(&entity(), state, &cost, &ralph_core::context::CancellationFlag::default());
        assert_eq!(outcome.termination_reason, TerminationReason::IterationCap);
        assert_eq!(outcome.final_state.iterations_completed, 3);
    }

    #[test]
    fn loop_terminates_on_cost_cap() {
        let mut config = RalphConfig::default();
        config.exploration.max_cost_per_entity_usd = 0.01;
        let search = MockSearchClient::new(
            vec![SearchResponse {
                status: SearchStatus::Success,
                results: vec![SearchResultItem { title: "t".into(), url: "https://e.com".into(), snippet: "s".into(), position: 0 }],
                cost_usd: 0.02,
            }],
            vec![FetchResponse { status: SearchStatus::Success, content: "content".into(), final_url: "https://e.com".into() }],
        );
        let provider = MockProvider::new(vec![MockResponse::content("irrelevant")]);
        let providers: Vec<(ModelTier, &dyn LlmProvider)> = vec![(ModelTier::Small, &provider)];
        let store = InMemorySignalStore::new();
        let exploration = ExplorationLoop::new(&config, &search, &providers, &store);
        let state = RalphState::new("e1", 0.20, 0.95);
        let cost = CostCounter::default();
        let outcome = exploration.run(&entity(), state, &cost, &ralph_core::context::CancellationFlag::default());
        assert_eq!(outcome.termination_reason, TerminationReason::CostCap);
    }

    #[test]
    fn loop_terminates_on_cancellation_before_its_first_iteration() {
        let config = RalphConfig::default();
        let search = MockSearchClient::new(vec![], vec![]);
        let provider = MockProvider::new(vec![MockResponse::content("irrelevant")]);
        let providers: Vec<(ModelTier, &dyn LlmProvider)> = vec![(ModelTier::Small, &provider)];
        let store = InMemorySignalStore::new();
        let exploration = ExplorationLoop::new(&config, &search, &providers, &store);
        let state = RalphState::new("e1", 0.20, 0.95);
        let cost = CostCounter::default();
        let cancellation = ralph_core::context::CancellationFlag::default();
        cancellation.cancel();
        let outcome = exploration.run(&entity(), state, &cost, &cancellation);
        assert_eq!(outcome.termination_reason, TerminationReason::Cancelled);
        assert_eq!(outcome.final_state.iterations_completed, 0);
    }
}
