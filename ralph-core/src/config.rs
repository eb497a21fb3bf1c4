// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The configuration surface (§6): every knob is enumerated here, not
//! free-form. Defaults match the spec's canonical values; everything is
//! serializable so `ralph-runtime` can layer file/env overrides on top.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Category, SourceType};

/// Ordered cascade of model identities: small (fast/cheap), medium, large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Small,
    Medium,
    Large,
}

impl ModelTier {
    pub const CASCADE: [ModelTier; 3] = [ModelTier::Small, ModelTier::Medium, ModelTier::Large];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub tier: ModelTier,
    pub identity: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationConfig {
    pub max_iterations: u32,
    pub max_cost_per_entity_usd: f64,
    pub starting_confidence: f64,
    pub absolute_ceiling: f64,
    pub weak_only_ceiling: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            max_cost_per_entity_usd: 2.00,
            starting_confidence: 0.20,
            absolute_ceiling: 0.95,
            weak_only_ceiling: 0.70,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub min_evidence: usize,
    pub min_candidate_confidence: f64,
    pub min_mean_post_credibility: f64,
    pub duplicate_cosine_threshold: f64,
    pub max_llm_adjustment: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_evidence: 3,
            min_candidate_confidence: 0.70,
            min_mean_post_credibility: 0.55,
            duplicate_cosine_threshold: 0.85,
            max_llm_adjustment: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    pub seasonality_window_days: u32,
    pub zscore_window_days: u32,
    pub momentum_windows_days: [u32; 2],
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            seasonality_window_days: 90,
            zscore_window_days: 90,
            momentum_windows_days: [30, 90],
        }
    }
}

/// Source-type → (credibility, hop multiplier) — §4.3 and §4.7's static
/// tables, versioned as configuration per §9's Open Questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTypeEntry {
    pub base_credibility: f64,
    pub hop_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTypeTable {
    pub entries: HashMap<SourceType, SourceTypeEntry>,
}

impl Default for SourceTypeTable {
    fn default() -> Self {
        use SourceType::{
            AnnualReport, Blog, CareersPosting, LeadershipJobPosting, OfficialHomepage,
            OperationalSocial, PartnershipAnnouncement, PressRelease, TechNews, TenderPortal,
        };
        let entries = [
            (PartnershipAnnouncement, 0.90, 1.2),
            (TechNews, 0.75, 1.1),
            (PressRelease, 0.70, 1.0),
            (CareersPosting, 0.60, 0.8),
            (LeadershipJobPosting, 0.60, 0.8),
            (Blog, 0.45, 0.6),
            (OperationalSocial, 0.20, 0.2),
            (OfficialHomepage, 0.10, 0.1),
            (TenderPortal, 0.80, 1.0),
            (AnnualReport, 0.65, 0.7),
        ]
        .into_iter()
        .map(|(s, cred, mult)| {
            (
                s,
                SourceTypeEntry {
                    base_credibility: cred,
                    hop_multiplier: mult,
                },
            )
        })
        .collect();
        Self { entries }
    }
}

impl SourceTypeTable {
    #[must_use]
    pub fn credibility(&self, source: SourceType) -> f64 {
        self.entries
            .get(&source)
            .map_or(0.5, |e| e.base_credibility)
    }

    #[must_use]
    pub fn hop_multiplier(&self, source: SourceType) -> f64 {
        self.entries.get(&source).map_or(1.0, |e| e.hop_multiplier)
    }
}

/// The closed future-action keyword set (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionKeywords {
    pub future_action: Vec<String>,
}

impl Default for DecisionKeywords {
    fn default() -> Self {
        Self {
            future_action: [
                "seeking",
                "hiring",
                "recruiting",
                "looking for",
                "procurement",
                "rfp",
                "tender",
                "vendor",
                "partner",
                "implement",
                "deploy",
                "evaluating",
                "modernizing",
                "migrating",
                "issue rfp",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl DecisionKeywords {
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.future_action.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// Static tag → category table used by the Priors Adapter (§4.11) to map a
/// dossier's `CAPABILITY` tags onto the closed category set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityCategoryTable {
    pub entries: HashMap<String, Category>,
}

impl Default for CapabilityCategoryTable {
    fn default() -> Self {
        use Category::{
            Analytics, Commerce, Content, Crm, Infrastructure, Leadership, Mobile, Ticketing,
        };
        let entries = [
            ("crm", Crm),
            ("customer relationship", Crm),
            ("ticketing", Ticketing),
            ("box office", Ticketing),
            ("analytics", Analytics),
            ("data platform", Analytics),
            ("mobile", Mobile),
            ("app", Mobile),
            ("commerce", Commerce),
            ("ecommerce", Commerce),
            ("content", Content),
            ("cms", Content),
            ("infrastructure", Infrastructure),
            ("cloud", Infrastructure),
            ("leadership", Leadership),
            ("executive", Leadership),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { entries }
    }
}

impl CapabilityCategoryTable {
    #[must_use]
    pub fn best_match(&self, text: &str) -> Category {
        let lower = text.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| lower.contains(k.as_str()))
            .map_or(Category::Other, |(_, v)| *v)
    }
}

/// The process-wide configuration surface (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RalphConfig {
    pub exploration: ExplorationConfig,
    pub thresholds: ThresholdConfig,
    pub temporal: TemporalConfig,
    pub source_types: SourceTypeTable,
    pub keywords: DecisionKeywords,
    pub capability_categories: CapabilityCategoryTable,
    pub model_cascade: Vec<ModelSpec>,
    /// Behind a feature flag per §9: cosine similarity as a secondary
    /// duplicate check, keyword-set match remains primary.
    pub enable_cosine_duplicate_check: bool,
}

impl Default for RalphConfig {
    fn default() -> Self {
        Self {
            exploration: ExplorationConfig::default(),
            thresholds: ThresholdConfig::default(),
            temporal: TemporalConfig::default(),
            source_types: SourceTypeTable::default(),
            keywords: DecisionKeywords::default(),
            capability_categories: CapabilityCategoryTable::default(),
            model_cascade: vec![
                ModelSpec {
                    tier: ModelTier::Small,
                    identity: "claude-haiku".to_string(),
                    max_tokens: 512,
                },
                ModelSpec {
                    tier: ModelTier::Medium,
                    identity: "claude-sonnet".to_string(),
                    max_tokens: 1024,
                },
                ModelSpec {
                    tier: ModelTier::Large,
                    identity: "claude-opus".to_string(),
                    max_tokens: 2048,
                },
            ],
            enable_cosine_duplicate_check: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive() {
        let kw = DecisionKeywords::default();
        assert!(kw.matches("The club is EVALUATING new CRM vendors"));
        assert!(!kw.matches("Nothing interesting happened today"));
    }

    #[test]
    fn source_table_orders_partnership_above_homepage() {
        let table = SourceTypeTable::default();
        assert!(
            table.credibility(SourceType::PartnershipAnnouncement)
                > table.credibility(SourceType::OfficialHomepage)
        );
    }
}
