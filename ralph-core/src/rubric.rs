// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Decision Rubric (§4.5): a pure function from an evidence item and
//! the surrounding state to one of the five decision classes plus a
//! human-readable reason. No I/O, no RNG — trivially testable.

use std::collections::HashSet;

use crate::config::DecisionKeywords;
use crate::model::{CategoryStats, Decision, Entity, EvidenceItem};

#[must_use]
pub fn is_new(evidence: &EvidenceItem, seen_fingerprints: &HashSet<String>) -> bool {
    !seen_fingerprints.contains(&EvidenceItem::fingerprint(&evidence.extracted_text))
}

/// Entity-specific = entity name (or a defined variant: drop corporate
/// suffix, first token, canonical alias) appears in extracted text.
#[must_use]
pub fn is_entity_specific(evidence: &EvidenceItem, entity: &Entity) -> bool {
    let text = evidence.extracted_text.to_lowercase();
    let name = entity.name.to_lowercase();
    if text.contains(&name) {
        return true;
    }
    let without_suffix = strip_corporate_suffix(&name);
    if without_suffix != name && text.contains(without_suffix) {
        return true;
    }
    if let Some(first_token) = name.split_whitespace().next() {
        if first_token.len() > 3 && text.contains(first_token) {
            return true;
        }
    }
    false
}

fn strip_corporate_suffix(name: &str) -> &str {
    const SUFFIXES: [&str; 6] = [" fc", " ab", " inc", " llc", " ltd", " co"];
    for suffix in SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped;
        }
    }
    name
}

#[must_use]
pub fn is_future_action(evidence: &EvidenceItem, keywords: &DecisionKeywords) -> bool {
    keywords.matches(&evidence.extracted_text)
}

#[must_use]
pub fn is_credible(evidence: &EvidenceItem) -> bool {
    evidence.source_type.is_credible_tier()
}

/// Whether the new evidence contradicts a prior accepted claim. Contradiction
/// detection is intentionally conservative: only an explicit negation of a
/// previously-seen fingerprinted claim counts, never topical overlap.
#[must_use]
pub fn contradicts(evidence: &EvidenceItem) -> bool {
    let lower = evidence.extracted_text.to_lowercase();
    ["no longer", "cancelled", "called off", "retracted", "denies"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// `classify(evidence, category_state, prior_evidences, entity) → (decision, reason)`.
#[must_use]
pub fn classify(
    evidence: &EvidenceItem,
    category_state: &CategoryStats,
    seen_fingerprints: &HashSet<String>,
    entity: &Entity,
    keywords: &DecisionKeywords,
) -> (Decision, String) {
    if category_state.is_saturated() {
        return (Decision::Saturated, "category already saturated".to_string());
    }

    let new = is_new(evidence, seen_fingerprints);
    if !new {
        return if contradicts(evidence) {
            (Decision::Reject, "contradicts prior evidence".to_string())
        } else {
            (Decision::NoProgress, "duplicate fingerprint".to_string())
        };
    }

    let entity_specific = is_entity_specific(evidence, entity);
    let future_action = is_future_action(evidence, keywords);
    let credible = is_credible(evidence);

    if entity_specific && future_action && credible {
        return (
            Decision::Accept,
            "new, entity-specific, future-action, credible source".to_string(),
        );
    }
    if entity_specific && credible && !future_action {
        return (
            Decision::WeakAccept,
            "new, entity-specific, credible, but no future-action keyword".to_string(),
        );
    }
    if !entity_specific && future_action {
        return (Decision::WeakAccept, "industry signal: future-action without entity match".to_string());
    }

    // New but missing two or more criteria → WEAK_ACCEPT once per
    // category, then NO_PROGRESS.
    let criteria_met = [entity_specific, future_action, credible]
        .iter()
        .filter(|&&b| b)
        .count();
    if criteria_met <= 1 {
        if category_state.weak_accept_once_used {
            return (Decision::NoProgress, "category already used its one weak-accept grace".to_string());
        }
        return (
            Decision::WeakAccept,
            "new evidence, missing two or more criteria (grace weak-accept)".to_string(),
        );
    }

    (Decision::NoProgress, "new evidence, insufficient signal".to_string())
}
