// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Hop Planner (§4.7): scores candidate source types by expected
//! information gain × source-class multiplier × blacklist penalty, and
//! carries the query-template library with empty-result fallbacks.

use crate::config::SourceTypeTable;
use crate::model::{ChannelBlacklist, SourceType};

/// Expected information gain for a hypothesis against a given source type.
/// A simple, explainable heuristic: hypotheses closer to the start of
/// their exploration (few reinforcements) have more to learn from any
/// source; the base rate is source-type independent, source multipliers
/// live in `SourceTypeTable`.
#[must_use]
pub fn base_eig(reinforcement_count: u32) -> f64 {
    1.0 / (1.0 + f64::from(reinforcement_count))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelScore {
    pub source_type: SourceType,
    pub score: f64,
    pub prior_failures: u32,
}

/// Scores every source type for a hypothesis with `reinforcement_count`
/// reinforcements, applying the blacklist penalty, and returns them sorted
/// best-first. Ties broken by lower prior-failure count, then lexical
/// order of source type for determinism (§4.7).
#[must_use]
pub fn score_channels(
    reinforcement_count: u32,
    table: &SourceTypeTable,
    blacklist: &ChannelBlacklist,
) -> Vec<ChannelScore> {
    let eig = base_eig(reinforcement_count);
    let mut scores: Vec<ChannelScore> = SourceType::ALL
        .iter()
        .map(|&source_type| {
            let multiplier = table.hop_multiplier(source_type);
            let penalty = blacklist.penalty(source_type);
            let prior_failures = blacklist
                .channels
                .get(&source_type)
                .map_or(0, |e| e.failure_count);
            ChannelScore {
                source_type,
                score: eig * multiplier * (1.0 - penalty),
                prior_failures,
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.prior_failures.cmp(&b.prior_failures))
            .then_with(|| format!("{:?}", a.source_type).cmp(&format!("{:?}", b.source_type)))
    });
    scores
}

/// Picks the best non-blacklisted channel, or `None` if every channel is
/// blacklisted.
#[must_use]
pub fn pick_next_channel(
    reinforcement_count: u32,
    table: &SourceTypeTable,
    blacklist: &ChannelBlacklist,
) -> Option<SourceType> {
    score_channels(reinforcement_count, table, blacklist)
        .into_iter()
        .find(|s| s.score > 0.0)
        .map(|s| s.source_type)
}

/// A small library of query templates per source type, with 2-3 fallback
/// variants tried in order if the primary returns empty (§4.7).
#[must_use]
pub fn query_templates(entity_name: &str, source_type: SourceType) -> Vec<String> {
    match source_type {
        SourceType::PartnershipAnnouncement => vec![
            format!("\"{entity_name}\" partnership announcement"),
            format!("\"{entity_name}\" signs partnership"),
            format!("{entity_name} new partner technology"),
        ],
        SourceType::TechNews => vec![
            format!("\"{entity_name}\" technology upgrade news"),
            format!("{entity_name} selects platform"),
        ],
        SourceType::PressRelease => vec![
            format!("\"{entity_name}\" press release technology"),
            format!("{entity_name} announces"),
        ],
        SourceType::CareersPosting | SourceType::LeadershipJobPosting => vec![
            format!("\"{entity_name}\" hiring CRM OR ticketing OR analytics"),
            format!("{entity_name} careers technology role"),
        ],
        SourceType::Blog => vec![format!("\"{entity_name}\" blog technology")],
        SourceType::OperationalSocial => vec![format!("\"{entity_name}\" social media technology post")],
        SourceType::OfficialHomepage => vec![format!("{entity_name} official site")],
        SourceType::TenderPortal => vec![
            format!("\"{entity_name}\" tender OR RFP"),
            format!("{entity_name} procurement notice"),
        ],
        SourceType::AnnualReport => vec![format!("\"{entity_name}\" annual report technology investment")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklisted_channel_scores_zero() {
        let table = SourceTypeTable::default();
        let mut blacklist = ChannelBlacklist::default();
        blacklist.record_failure(SourceType::Blog);
        blacklist.record_failure(SourceType::Blog);
        blacklist.record_failure(SourceType::Blog);
        let scores = score_channels(0, &table, &blacklist);
        let blog = scores.iter().find(|s| s.source_type == SourceType::Blog).unwrap();
        assert_eq!(blog.score, 0.0);
    }

    #[test]
    fn partnership_announcement_ranks_above_homepage_when_active() {
        let table = SourceTypeTable::default();
        let blacklist = ChannelBlacklist::default();
        let scores = score_channels(0, &table, &blacklist);
        let pa_rank = scores.iter().position(|s| s.source_type == SourceType::PartnershipAnnouncement).unwrap();
        let home_rank = scores.iter().position(|s| s.source_type == SourceType::OfficialHomepage).unwrap();
        assert!(pa_rank < home_rank);
    }

    #[test]
    fn query_templates_provide_fallback_variants() {
        let templates = query_templates("Example FC", SourceType::PartnershipAnnouncement);
        assert!(templates.len() >= 2);
    }
}
