// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Priors Adapter (§4.11): converts an externally-supplied dossier
//! into seed hypotheses, per-channel multipliers, and an initial
//! confidence no greater than 0.25 (a dossier is a prior, not proof).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ralph_core::config::CapabilityCategoryTable;
use ralph_core::model::{Hypothesis, RalphState, SourceType};

/// The closed set of tags a dossier's insights are labeled with (§6
/// inbound shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InsightTag {
    Procurement,
    Capability,
    Timing,
    Contact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedInsight {
    pub tag: InsightTag,
    pub text: String,
    /// 0-100 per §6's inbound shape.
    pub confidence: u8,
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DossierMetadata {
    pub entity_id: String,
    pub entity_name: String,
    pub priority_score: u8,
    pub generated_at: DateTime<Utc>,
}

/// Externally-generated dossier object (§6 inbound shape). The core
/// consumes this read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dossier {
    pub metadata: DossierMetadata,
    pub insights: Vec<TaggedInsight>,
    /// A known current vendor, if the dossier names one — drives the
    /// "downweight homepage, upweight tech news" channel adjustment.
    pub known_current_vendor: Option<String>,
}

/// Absolute cap on the seeded confidence: a dossier is a prior, not proof
/// (§4.11).
const MAX_SEEDED_CONFIDENCE: f64 = 0.25;

/// Per-channel multiplier adjustment applied on top of the static hop
/// table when a dossier names a known current vendor.
#[derive(Debug, Clone, Copy)]
pub struct ChannelAdjustment {
    pub source_type: SourceType,
    pub multiplier_delta: f64,
}

pub struct SeedResult {
    pub hypotheses: Vec<Hypothesis>,
    pub channel_adjustments: Vec<ChannelAdjustment>,
    pub starting_confidence: f64,
}

/// Seeds hypotheses and channel weights from a dossier, per §4.11's table:
/// PROCUREMENT → category best matching the claim text; CAPABILITY → the
/// named capability category; TIMING → attached as a temporal hint, not a
/// hypothesis; CONTACT → recorded but not used as a hypothesis.
#[must_use]
pub fn seed_from_dossier(dossier: &Dossier, capability_table: &CapabilityCategoryTable) -> SeedResult {
    let mut hypotheses = Vec::new();
    let mut next_id = 0usize;

    for insight in &dossier.insights {
        let category = match insight.tag {
            InsightTag::Procurement | InsightTag::Capability => {
                Some(capability_table.best_match(&insight.text))
            }
            InsightTag::Timing | InsightTag::Contact => None,
        };
        if let Some(category) = category {
            next_id += 1;
            let prior = (f64::from(insight.confidence) / 100.0).min(1.0);
            hypotheses.push(Hypothesis::new(
                format!("{}-prior-{next_id}", dossier.metadata.entity_id),
                dossier.metadata.entity_id.clone(),
                category,
                insight.text.clone(),
                prior,
            ));
        }
    }

    let mut channel_adjustments = Vec::new();
    if dossier.known_current_vendor.is_some() {
        channel_adjustments.push(ChannelAdjustment { source_type: SourceType::OfficialHomepage, multiplier_delta: -0.05 });
        channel_adjustments.push(ChannelAdjustment { source_type: SourceType::TechNews, multiplier_delta: 0.10 });
    }

    let strongest_insight_confidence = dossier
        .insights
        .iter()
        .map(|i| f64::from(i.confidence) / 100.0)
        .fold(0.0_f64, f64::max);
    let starting_confidence = (0.20 + strongest_insight_confidence * 0.05).min(MAX_SEEDED_CONFIDENCE);

    SeedResult { hypotheses, channel_adjustments, starting_confidence }
}

/// Convenience constructor for a fresh `RalphState` seeded from a dossier.
/// Seeded hypotheses are loaded into the state's Hypothesis Store so they
/// participate in the category-diversity rule and reinforcement from the
/// first hop onward, not just returned and discarded.
#[must_use]
pub fn seed_state(dossier: &Dossier, absolute_ceiling: f64) -> RalphState {
    let seed = seed_from_dossier(dossier, &CapabilityCategoryTable::default());
    let mut state = RalphState::new(dossier.metadata.entity_id.clone(), seed.starting_confidence, absolute_ceiling);
    for hypothesis in seed.hypotheses {
        state.hypothesis_store.add(hypothesis);
    }
    state
}

/// The Priors Adapter, wrapping the pure seeding functions above for
/// callers that want a named component (mirrors how other trait-seam
/// components in this crate are exposed).
pub struct PriorsAdapter {
    capability_table: CapabilityCategoryTable,
}

impl Default for PriorsAdapter {
    fn default() -> Self {
        Self { capability_table: CapabilityCategoryTable::default() }
    }
}

impl PriorsAdapter {
    #[must_use]
    pub fn new(capability_table: CapabilityCategoryTable) -> Self {
        Self { capability_table }
    }

    #[must_use]
    pub fn seed(&self, dossier: &Dossier) -> SeedResult {
        seed_from_dossier(dossier, &self.capability_table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralph_core::model::Category;

    fn dossier() -> Dossier {
        Dossier {
            metadata: DossierMetadata {
                entity_id: "e1".into(),
                entity_name: "Example FC".into(),
                priority_score: 70,
                generated_at: Utc::now(),
            },
            insights: vec![
                TaggedInsight { tag: InsightTag::Capability, text: "needs a new CRM platform".into(), confidence: 80, timeline: None },
                TaggedInsight { tag: InsightTag::Timing, text: "budget cycle opens Q3".into(), confidence: 60, timeline: Some("Q3".into()) },
                TaggedInsight { tag: InsightTag::Contact, text: "head of IT reachable via LinkedIn".into(), confidence: 50, timeline: None },
            ],
            known_current_vendor: Some("LegacyCRM Inc".into()),
        }
    }

    #[test]
    fn capability_insight_seeds_a_hypothesis_in_the_right_category() {
        let adapter = PriorsAdapter::default();
        let result = adapter.seed(&dossier());
        assert_eq!(result.hypotheses.len(), 1);
        assert_eq!(result.hypotheses[0].category, Category::Crm);
    }

    #[test]
    fn timing_and_contact_insights_never_become_hypotheses() {
        let adapter = PriorsAdapter::default();
        let result = adapter.seed(&dossier());
        assert!(result.hypotheses.iter().all(|h| h.category != Category::Other));
        assert_eq!(result.hypotheses.len(), 1);
    }

    #[test]
    fn starting_confidence_never_exceeds_the_prior_cap() {
        let adapter = PriorsAdapter::default();
        let mut strong = dossier();
        strong.insights[0].confidence = 100;
        let result = adapter.seed(&strong);
        assert!(result.starting_confidence <= MAX_SEEDED_CONFIDENCE);
    }

    #[test]
    fn known_vendor_shifts_homepage_and_tech_news_multipliers() {
        let adapter = PriorsAdapter::default();
        let result = adapter.seed(&dossier());
        let homepage = result.channel_adjustments.iter().find(|a| a.source_type == SourceType::OfficialHomepage).unwrap();
        let tech_news = result.channel_adjustments.iter().find(|a| a.source_type == SourceType::TechNews).unwrap();
        assert!(homepage.multiplier_delta < 0.0);
        assert!(tech_news.multiplier_delta > 0.0);
    }
}
