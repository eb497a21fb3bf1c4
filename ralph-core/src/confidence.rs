// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Confidence Engine (§4.6): a deterministic, drift-free update over
//! decision classes with diminishing returns, ceiling damping, novelty and
//! alignment multipliers, and the actionable gate. Pure — applying the
//! same `(decision, state)` twice never changes hidden state (§8).

use crate::model::{Category, Decision, RalphState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Novelty {
    /// New evidence, new hypothesis.
    New,
    /// New evidence, strengthens an existing hypothesis.
    Reinforcing,
    /// Fingerprint duplicate.
    Duplicate,
}

impl Novelty {
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Novelty::New => 1.0,
            Novelty::Reinforcing => 0.6,
            Novelty::Duplicate => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Predictive keyword present.
    Predictive,
    Neutral,
    Noise,
}

impl Alignment {
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Alignment::Predictive => 0.8,
            Alignment::Neutral => 0.5,
            Alignment::Noise => 0.3,
        }
    }
}

#[must_use]
pub fn raw_delta(decision: Decision) -> f64 {
    match decision {
        Decision::Accept => 0.06,
        Decision::WeakAccept => 0.02,
        Decision::Reject | Decision::NoProgress | Decision::Saturated => 0.0,
    }
}

#[must_use]
pub fn ceiling_damping(current_confidence: f64, ceiling: f64) -> f64 {
    let proximity = (current_confidence - 0.20) / (ceiling - 0.20);
    (1.0 - proximity * proximity).clamp(0.0, 1.0)
}

/// Diminishing returns on ACCEPT: `1 / (1 + accepted_in_category)`.
#[must_use]
pub fn category_factor(accepted_in_category: u32) -> f64 {
    1.0 / (1.0 + f64::from(accepted_in_category))
}

/// Decay applied only to WEAK_ACCEPT: `1 / (1 + weak_accepts * 0.5)`.
#[must_use]
pub fn weak_decay(weak_accepts_in_category: u32) -> f64 {
    1.0 / (1.0 + f64::from(weak_accepts_in_category) * 0.5)
}

/// The per-step confidence update. Returns the new confidence; callers are
/// responsible for mutating `RalphState`'s bookkeeping (category stats,
/// accepted counts) — this function itself performs no mutation beyond the
/// arithmetic so it stays trivially testable per §8's purity law.
#[must_use]
pub fn apply_decision(
    current_confidence: f64,
    ceiling: f64,
    decision: Decision,
    novelty: Novelty,
    alignment: Alignment,
    accepted_in_category: u32,
    weak_accepts_in_category: u32,
) -> f64 {
    let damping = ceiling_damping(current_confidence, ceiling);
    let class_factor = match decision {
        Decision::Accept => category_factor(accepted_in_category),
        Decision::WeakAccept => weak_decay(weak_accepts_in_category),
        _ => 1.0,
    };
    let applied_delta =
        raw_delta(decision) * novelty.factor() * alignment.factor() * damping * class_factor;
    (current_confidence + applied_delta).clamp(0.05, ceiling.min(0.95))
}

/// The actionable gate (§4.6 guardrail). Call after every confidence
/// update; mutates `state.confidence_ceiling` and `state.is_actionable`.
pub fn apply_actionable_gate(state: &mut RalphState, weak_only_ceiling: f64) {
    if state.accepted_count_total == 0 {
        state.confidence_ceiling = weak_only_ceiling;
        state.confidence = state.confidence.clamp(0.05, state.confidence_ceiling.min(0.95));
    }
    state.is_actionable =
        state.accepted_count_total >= 2 && state.categories_with_accepts.len() >= 2;
}

/// Saturation score per category (§4.6).
#[must_use]
pub fn saturation_score(
    reject: u32,
    no_progress: u32,
    total_in_category: u32,
    last_two_decisions: &[Decision],
    accept: u32,
) -> f64 {
    if total_in_category == 0 {
        return 0.0;
    }
    let negative_ratio = f64::from(reject + no_progress) / f64::from(total_in_category);
    let consecutive_penalty = if last_two_decisions.len() == 2
        && last_two_decisions
            .iter()
            .all(|d| matches!(d, Decision::WeakAccept | Decision::NoProgress))
    {
        0.3
    } else {
        0.0
    };
    let accept_rate = f64::from(accept) / f64::from(total_in_category);
    let accept_penalty = (1.0 - 2.0 * accept_rate).max(0.0);
    (0.5 * negative_ratio + consecutive_penalty + 0.2 * accept_penalty).clamp(0.0, 1.0)
}

/// Applies a full decision step to `state` for `category`: updates
/// category stats, saturation, confidence, the actionable gate, and the
/// global-saturation flag. This is the entry point the Exploration Loop
/// calls once per evidence item.
pub fn update_state(
    state: &mut RalphState,
    category: Category,
    decision: Decision,
    novelty: Novelty,
    alignment: Alignment,
    weak_only_ceiling: f64,
) {
    let accepted_in_category = state.category_stats_mut(category).accept;
    let weak_in_category = state.category_stats_mut(category).weak_accept;

    let new_confidence = apply_decision(
        state.confidence,
        state.confidence_ceiling,
        decision,
        novelty,
        alignment,
        accepted_in_category,
        weak_in_category,
    );
    state.confidence = new_confidence;
    state.confidence_history.push(new_confidence);

    if decision == Decision::Accept {
        state.accepted_count_total += 1;
        state.categories_with_accepts.insert(category);
    }

    let stats = state.category_stats_mut(category);
    if decision == Decision::WeakAccept {
        stats.weak_accept_once_used = true;
    }
    stats.record(decision);
    stats.accepted_signals = stats.accept;
    let total = stats.total();
    let last_two = stats.last_two_decisions.clone();
    stats.saturation_score =
        saturation_score(stats.reject, stats.no_progress, total, &last_two, stats.accept);

    state.category_saturated = state.categories.values().any(crate::model::CategoryStats::is_saturated);

    apply_actionable_gate(state, weak_only_ceiling);
    state.recompute_global_saturation();
    state.recompute_confidence_saturation();
}
