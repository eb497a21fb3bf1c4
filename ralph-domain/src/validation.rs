// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The four-pass Validation Pipeline (§4.8): rule filter → evidence
//! verification → LLM consistency check → final confirmation. Failure at
//! any pass discards the candidate; validation never raises, it returns a
//! structured reason (§9 Design Notes).

use chrono::Utc;
use serde::Deserialize;

use ralph_core::config::{SourceTypeTable, ThresholdConfig};
use ralph_core::llm::{LlmProvider, LlmRequest};
use ralph_core::model::{canonicalize_claim, signal_id, PriorityTier, SignalCandidate, ValidatedSignal};
use ralph_core::search::SearchClient;

use crate::fit::{fit_score, FitInputs};
use crate::signal_store::SignalStore;
use crate::verifier;

/// Structured rejection reason (§9: "replace exceptions for control flow
/// in validation with a result type whose error variant carries the
/// structured reason").
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    Rule(String),
    Verification(String),
    Llm(String),
    Duplicate(String),
}

impl ValidationFailure {
    #[must_use]
    pub fn pass(&self) -> u8 {
        match self {
            ValidationFailure::Rule(_) => 1,
            ValidationFailure::Verification(_) => 2,
            ValidationFailure::Llm(_) => 3,
            ValidationFailure::Duplicate(_) => 4,
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            ValidationFailure::Rule(r)
            | ValidationFailure::Verification(r)
            | ValidationFailure::Llm(r)
            | ValidationFailure::Duplicate(r) => r,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LlmAdjudication {
    validated_confidence: f64,
    rationale: String,
    #[serde(default)]
    requires_manual_review: bool,
}

/// Pass 1: rule filter. `len(evidence) >= min_evidence`; `raw_confidence
/// >= min_candidate_confidence`; `mean(pre-verification credibility) >=
/// 0.60`.
fn pass_rule_filter(candidate: &SignalCandidate, thresholds: &ThresholdConfig) -> Result<(), ValidationFailure> {
    if candidate.evidence.len() < thresholds.min_evidence {
        return Err(ValidationFailure::Rule(format!(
            "evidence count {} below minimum {}",
            candidate.evidence.len(),
            thresholds.min_evidence
        )));
    }
    if candidate.raw_confidence < thresholds.min_candidate_confidence {
        return Err(ValidationFailure::Rule(format!(
            "raw confidence {:.2} below minimum {:.2}",
            candidate.raw_confidence, thresholds.min_candidate_confidence
        )));
    }
    let mean_pre: f64 = candidate.evidence.iter().map(|e| e.pre_verification_credibility).sum::<f64>()
        / candidate.evidence.len() as f64;
    if mean_pre < 0.60 {
        return Err(ValidationFailure::Rule(format!("mean pre-verification credibility {mean_pre:.2} below 0.60")));
    }
    Ok(())
}

/// Pass 2: evidence verification. Applies §4.3 to every evidence item,
/// then requires `mean(post-verification credibility) >=
/// min_mean_post_credibility` and at least one item with `accessible &&
/// content_matches`.
fn pass_evidence_verification(
    candidate: &mut SignalCandidate,
    search: &dyn SearchClient,
    source_types: &SourceTypeTable,
    entity_name: &str,
    claim_keywords: &[String],
    thresholds: &ThresholdConfig,
) -> Result<(), ValidationFailure> {
    for item in &mut candidate.evidence {
        if !item.verified {
            verifier::verify(item, search, source_types, entity_name, claim_keywords);
        }
    }

    let mean_post: f64 = candidate.evidence.iter().map(|e| e.post_verification_credibility).sum::<f64>()
        / candidate.evidence.len() as f64;
    if mean_post < thresholds.min_mean_post_credibility {
        return Err(ValidationFailure::Verification(format!(
            "mean post-verification credibility {mean_post:.2} below minimum {:.2}",
            thresholds.min_mean_post_credibility
        )));
    }
    if !candidate.evidence.iter().any(|e| e.accessible && e.content_matches) {
        return Err(ValidationFailure::Verification(
            "no evidence item is both accessible and content-matching".to_string(),
        ));
    }
    Ok(())
}

/// Pass 3: LLM consistency check. The LLM may adjust confidence by at most
/// `max_llm_adjustment`; larger deltas are clipped and
/// `requires_manual_review` is raised. Rejects cosine-equivalent
/// duplicates against recent validated signals for this entity.
fn pass_llm_consistency(
    candidate: &SignalCandidate,
    recent_signals: &[ValidatedSignal],
    provider: &dyn LlmProvider,
    thresholds: &ThresholdConfig,
) -> Result<(f64, bool), ValidationFailure> {
    let recent_claims: Vec<String> = recent_signals
        .iter()
        .take(10)
        .filter_map(|s| s.verified_evidence.first().map(|e| e.extracted_text.clone()))
        .collect();
    let candidate_claim = candidate
        .evidence
        .first()
        .map(|e| e.extracted_text.clone())
        .unwrap_or_default();

    let prompt = format!(
        "Existing validated signals for this entity:\n{}\n\nCandidate claim: {candidate_claim}\nRaw confidence: {:.2}\n\nReturn JSON: {{\"validated_confidence\": <0-1>, \"rationale\": <string>, \"requires_manual_review\": <bool>}}",
        recent_claims.join("\n"),
        candidate.raw_confidence,
    );
    let request = LlmRequest::new(prompt, 512).expecting_schema();
    let response = provider
        .complete(&request)
        .map_err(|e| ValidationFailure::Llm(format!("LLM adjudication call failed: {e}")))?;

    let adjudication: LlmAdjudication = serde_json::from_str(response.content.trim())
        .map_err(|e| ValidationFailure::Llm(format!("LLM response unparseable: {e}")))?;
    tracing::debug!(rationale = %adjudication.rationale, "LLM adjudication rationale");

    let delta = adjudication.validated_confidence - candidate.raw_confidence;
    let (clipped_confidence, requires_review) = if delta.abs() > thresholds.max_llm_adjustment {
        let clipped = candidate.raw_confidence + thresholds.max_llm_adjustment.copysign(delta);
        (clipped.clamp(0.0, 1.0), true)
    } else {
        (adjudication.validated_confidence.clamp(0.0, 1.0), adjudication.requires_manual_review)
    };

    let candidate_canonical = canonicalize_claim(&candidate_claim);
    let is_duplicate = recent_signals.iter().any(|s| {
        s.category == candidate.category
            && s.verified_evidence
                .first()
                .map(|e| canonicalize_claim(&e.extracted_text) == candidate_canonical)
                .unwrap_or(false)
    });
    if is_duplicate {
        return Err(ValidationFailure::Duplicate(
            "candidate's claim duplicates an existing validated signal".to_string(),
        ));
    }

    Ok((clipped_confidence, requires_review))
}

/// Pass 4: final confirmation. `final_confidence = clamp(validated_confidence
/// * temporal_multiplier, 0, 1)`. Last duplicate check against the
/// already-written set using the canonicalized (category, claim) key.
fn pass_final_confirmation(
    candidate: &SignalCandidate,
    validated_confidence: f64,
    temporal_multiplier: f64,
    store: &dyn SignalStore,
) -> Result<f64, ValidationFailure> {
    let claim = candidate
        .evidence
        .first()
        .map(|e| e.extracted_text.clone())
        .unwrap_or_default();
    let canonical = canonicalize_claim(&claim);
    if store.already_written(&candidate.entity_id, candidate.category, &canonical) {
        return Err(ValidationFailure::Duplicate(
            "already written to the signal store under this canonical claim".to_string(),
        ));
    }
    Ok((validated_confidence * temporal_multiplier).clamp(0.0, 1.0))
}

/// Runs all four passes in order. On success, the candidate becomes a
/// `ValidatedSignal` with `validation_pass = 3` (as specified) and
/// `validated_at = now`; the caller is responsible for handing it to the
/// `SignalStore`.
#[allow(clippy::too_many_arguments)]
pub fn validate(
    mut candidate: SignalCandidate,
    recent_signals: &[ValidatedSignal],
    search: &dyn SearchClient,
    provider: &dyn LlmProvider,
    store: &dyn SignalStore,
    source_types: &SourceTypeTable,
    thresholds: &ThresholdConfig,
    entity_name: &str,
    claim_keywords: &[String],
    fit_inputs: FitInputs,
) -> Result<ValidatedSignal, ValidationFailure> {
    pass_rule_filter(&candidate, thresholds)?;
    candidate.validation_pass = 1;

    pass_evidence_verification(&mut candidate, search, source_types, entity_name, claim_keywords, thresholds)?;
    candidate.validation_pass = 2;

    let (validated_confidence, requires_manual_review) =
        pass_llm_consistency(&candidate, recent_signals, provider, thresholds)?;
    candidate.validation_pass = 3;

    let final_confidence = pass_final_confirmation(&candidate, validated_confidence, candidate.temporal_multiplier, store)?;

    let score = fit_score(fit_inputs);
    let signal = ValidatedSignal {
        signal_id: signal_id(&candidate.entity_id, candidate.category, &canonicalize_claim(
            &candidate.evidence.first().map(|e| e.extracted_text.clone()).unwrap_or_default(),
        )),
        entity_id: candidate.entity_id.clone(),
        category: candidate.category,
        confidence_before: candidate.raw_confidence,
        confidence_after: final_confidence,
        verified_evidence: candidate.evidence.clone(),
        validation_pass: 3,
        validated_at: Utc::now(),
        temporal_multiplier: candidate.temporal_multiplier,
        fit_score: score,
        priority_tier: PriorityTier::from_fit_score(score),
        primary_reason: candidate.primary_reason.clone(),
        urgency: None,
        requires_manual_review,
    };
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ralph_core::model::Category;
    use ralph_core::model::{EvidenceItem, SourceType};
    use ralph_provider::{MockProvider, MockResponse, MockSearchClient};
    use ralph_core::search::{FetchResponse, SearchStatus};

    fn evidence(credibility: f64, source: SourceType) -> EvidenceItem {
        EvidenceItem {
            id: "ev".into(),
            source_type: source,
            url: "https://example.com/a".into(),
            observed_at: Utc::now(),
            extracted_text: "Example FC is evaluating new CRM vendors".into(),
            pre_verification_credibility: credibility,
            post_verification_credibility: credibility,
            accessible: false,
            content_matches: false,
            verified: false,
        }
    }

    fn candidate() -> SignalCandidate {
        SignalCandidate {
            candidate_id: "c1".into(),
            entity_id: "e1".into(),
            category: Category::Crm,
            evidence: vec![
                evidence(0.8, SourceType::PartnershipAnnouncement),
                evidence(0.75, SourceType::PressRelease),
                evidence(0.7, SourceType::TechNews),
            ],
            raw_confidence: 0.75,
            temporal_multiplier: 1.0,
            primary_reason: Some("entity-specific future-action evidence".into()),
            validated: false,
            validation_pass: 0,
        }
    }

    #[test]
    fn pass_1_rejects_too_few_evidence_items() {
        let mut c = candidate();
        c.evidence.truncate(1);
        let thresholds = ThresholdConfig::default();
        assert!(matches!(pass_rule_filter(&c, &thresholds), Err(ValidationFailure::Rule(_))));
    }

    #[test]
    fn url_verification_veto_fails_pass_2() {
        let mut c = candidate();
        let search = MockSearchClient::new(
            vec![],
            vec![
                FetchResponse { status: SearchStatus::Error, content: String::new(), final_url: String::new() },
                FetchResponse { status: SearchStatus::Error, content: String::new(), final_url: String::new() },
                FetchResponse { status: SearchStatus::Error, content: String::new(), final_url: String::new() },
            ],
        );
        let source_types = SourceTypeTable::default();
        let thresholds = ThresholdConfig::default();
        let result = pass_evidence_verification(&mut c, &search, &source_types, "Example FC", &["crm".to_string()], &thresholds);
        assert!(matches!(result, Err(ValidationFailure::Verification(_))));
    }

    #[test]
    fn llm_delta_beyond_max_adjustment_is_clipped_and_flags_review() {
        let c = candidate();
        let provider = MockProvider::new(vec![MockResponse::content(
            "{\"validated_confidence\": 0.95, \"rationale\": \"strong\", \"requires_manual_review\": false}",
        )]);
        let thresholds = ThresholdConfig::default();
        let (confidence, requires_review) = pass_llm_consistency(&c, &[], &provider, &thresholds).unwrap();
        assert!((confidence - 0.90).abs() < 1e-9);
        assert!(requires_review);
    }

    #[test]
    #[tracing_test::traced_test]
    fn llm_consistency_logs_the_adjudication_rationale() {
        let c = candidate();
        let provider = MockProvider::new(vec![MockResponse::content(
            "{\"validated_confidence\": 0.62, \"rationale\": \"matches prior reporting\", \"requires_manual_review\": false}",
        )]);
        let thresholds = ThresholdConfig::default();
        pass_llm_consistency(&c, &[], &provider, &thresholds).unwrap();
        assert!(logs_contain("matches prior reporting"));
    }

    #[test]
    fn duplicate_claim_against_store_fails_pass_4() {
        let c = candidate();
        let store = crate::signal_store::InMemorySignalStore::new();
        let canonical = canonicalize_claim(&c.evidence[0].extracted_text);
        store
            .upsert_signal(&ValidatedSignal {
                signal_id: "existing".into(),
                entity_id: "e1".into(),
                category: Category::Crm,
                confidence_before: 0.7,
                confidence_after: 0.8,
                verified_evidence: vec![c.evidence[0].clone()],
                validation_pass: 3,
                validated_at: Utc::now(),
                temporal_multiplier: 1.0,
                fit_score: 80.0,
                priority_tier: PriorityTier::Tier2,
                primary_reason: None,
                urgency: None,
                requires_manual_review: false,
            })
            .unwrap();
        let _ = canonical;
        let result = pass_final_confirmation(&c, 0.8, 1.0, &store);
        assert!(matches!(result, Err(ValidationFailure::Duplicate(_))));
    }
}
