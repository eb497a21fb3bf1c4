// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Evidence Verifier (§4.3, "Pass 1.5" of validation): URL
//! reachability, source-type credibility, recency decay, and
//! content-claim matching.

use chrono::Utc;
use ralph_core::config::SourceTypeTable;
use ralph_core::model::EvidenceItem;
use ralph_core::search::{SearchClient, SearchStatus};

const RECENCY_WINDOW_DAYS: i64 = 30;

/// Verifies a single evidence item in place, mutating its credibility and
/// `accessible`/`content_matches`/`verified` fields per §4.3's four-step
/// procedure. `entity_name` and `claim_keywords` drive the content-claim
/// match in step (d).
pub fn verify(
    evidence: &mut EvidenceItem,
    search: &dyn SearchClient,
    table: &SourceTypeTable,
    entity_name: &str,
    claim_keywords: &[String],
) {
    let mut credibility = evidence.pre_verification_credibility.max(table.credibility(evidence.source_type));

    // (a) URL reachability.
    let fetch = search.fetch_markdown(&evidence.url);
    if fetch.status != SearchStatus::Success {
        credibility -= 0.30;
        evidence.accessible = false;
    } else {
        evidence.accessible = true;
    }

    // (b) source-type credibility lookup already folded into the starting
    // value above.

    // (c) recency decay.
    let age_days = (Utc::now() - evidence.observed_at).num_days();
    if age_days > RECENCY_WINDOW_DAYS {
        credibility -= 0.10;
    }

    // (d) content-claim matching against the downloaded excerpt. An
    // unreachable URL has no excerpt to check, so it counts as a mismatch.
    if evidence.accessible {
        let haystack = fetch.content.to_lowercase();
        let mentions_entity = haystack.contains(&entity_name.to_lowercase());
        let mentions_claim = claim_keywords.is_empty()
            || claim_keywords.iter().any(|k| haystack.contains(&k.to_lowercase()));
        evidence.content_matches = mentions_entity && mentions_claim;
    } else {
        evidence.content_matches = false;
    }
    if evidence.content_matches {
        credibility += 0.05;
    } else {
        credibility -= 0.15;
    }

    evidence.post_verification_credibility = credibility.clamp(0.0, 1.0);
    evidence.verified = true;
}

/// Tie-break for equal credibility: earlier observed-at date loses (§4.3).
/// Returns `Ordering` suitable for a descending sort (most-credible,
/// most-recent first).
#[must_use]
pub fn compare_for_ranking(a: &EvidenceItem, b: &EvidenceItem) -> std::cmp::Ordering {
    b.post_verification_credibility
        .partial_cmp(&a.post_verification_credibility)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| b.observed_at.cmp(&a.observed_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralph_core::model::SourceType;
    use ralph_provider::MockSearchClient;
    use ralph_core::search::FetchResponse;
    use chrono::Duration;

    fn evidence(source_type: SourceType, days_old: i64) -> EvidenceItem {
        EvidenceItem {
            id: "e1".into(),
            source_type,
            url: "https://example.com/a".into(),
            observed_at: Utc::now() - Duration::days(days_old),
            extracted_text: "Example FC is evaluating new CRM vendors".into(),
            pre_verification_credibility: 0.9,
            post_verification_credibility: 0.0,
            accessible: false,
            content_matches: false,
            verified: false,
        }
    }

    #[test]
    fn unreachable_url_with_high_prior_lands_at_or_below_point_six() {
        let mut ev = evidence(SourceType::PartnershipAnnouncement, 0);
        let table = SourceTypeTable::default();
        let search = MockSearchClient::new(
            vec![],
            vec![FetchResponse { status: SearchStatus::Error, content: String::new(), final_url: ev.url.clone() }],
        );
        verify(&mut ev, &search, &table, "Example FC", &["crm".to_string()]);
        assert!(ev.post_verification_credibility <= 0.60);
        assert!(!ev.accessible);
    }

    #[test]
    fn stale_evidence_gets_recency_penalty() {
        let mut fresh = evidence(SourceType::PressRelease, 0);
        let mut stale = evidence(SourceType::PressRelease, 45);
        let table = SourceTypeTable::default();
        let ok = |url: &str| FetchResponse {
            status: SearchStatus::Success,
            content: "Example FC is evaluating new CRM vendors".to_string(),
            final_url: url.to_string(),
        };
        let search_fresh = MockSearchClient::new(vec![], vec![ok(&fresh.url)]);
        let search_stale = MockSearchClient::new(vec![], vec![ok(&stale.url)]);
        verify(&mut fresh, &search_fresh, &table, "Example FC", &["crm".to_string()]);
        verify(&mut stale, &search_stale, &table, "Example FC", &["crm".to_string()]);
        assert!(stale.post_verification_credibility < fresh.post_verification_credibility);
    }

    #[test]
    fn content_mismatch_reduces_credibility() {
        let mut ev = evidence(SourceType::PressRelease, 0);
        let table = SourceTypeTable::default();
        let search = MockSearchClient::new(
            vec![],
            vec![FetchResponse {
                status: SearchStatus::Success,
                content: "completely unrelated content about weather".to_string(),
                final_url: ev.url.clone(),
            }],
        );
        verify(&mut ev, &search, &table, "Example FC", &["crm".to_string()]);
        assert!(!ev.content_matches);
        assert!(ev.verified);
    }
}
