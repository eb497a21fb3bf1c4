// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The data model shared by every component: entities, hypotheses, evidence,
//! per-category statistics, the per-entity working state, and the two
//! signal shapes (candidate, validated).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hypothesis_store::HypothesisStore;

/// A target of discovery, supplied by an external catalog and never mutated
/// by the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    /// 0-100, controls dossier depth.
    pub priority_score: u8,
}

/// The closed set of procurement/capability categories hypotheses and
/// signals are tracked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Crm,
    Ticketing,
    Analytics,
    Mobile,
    Commerce,
    Content,
    Infrastructure,
    Leadership,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Crm,
        Category::Ticketing,
        Category::Analytics,
        Category::Mobile,
        Category::Commerce,
        Category::Content,
        Category::Infrastructure,
        Category::Leadership,
        Category::Other,
    ];
}

/// The closed set of evidence source types, ordered from least to most
/// credible per the §4.3 trust table (see `config::SourceTypeTable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    OfficialHomepage,
    OperationalSocial,
    Blog,
    CareersPosting,
    LeadershipJobPosting,
    PressRelease,
    TechNews,
    PartnershipAnnouncement,
    TenderPortal,
    AnnualReport,
}

impl SourceType {
    pub const ALL: [SourceType; 10] = [
        SourceType::OfficialHomepage,
        SourceType::OperationalSocial,
        SourceType::Blog,
        SourceType::CareersPosting,
        SourceType::LeadershipJobPosting,
        SourceType::PressRelease,
        SourceType::TechNews,
        SourceType::PartnershipAnnouncement,
        SourceType::TenderPortal,
        SourceType::AnnualReport,
    ];

    /// Upper tier per §4.5's "credible source" predicate: press release and
    /// above.
    #[must_use]
    pub fn is_credible_tier(self) -> bool {
        matches!(
            self,
            SourceType::PressRelease
                | SourceType::TechNews
                | SourceType::PartnershipAnnouncement
                | SourceType::TenderPortal
                | SourceType::AnnualReport
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HypothesisStatus {
    Active,
    Retired,
}

/// A testable assertion about an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub entity_id: String,
    pub category: Category,
    pub statement: String,
    /// Invariant: `0 ≤ prior_confidence ≤ 1`.
    pub prior_confidence: f64,
    pub reinforcement_count: u32,
    pub status: HypothesisStatus,
}

impl Hypothesis {
    /// # Panics
    /// Panics if `statement` is empty or `prior_confidence` is out of
    /// `[0, 1]` — both are data-model invariants callers must uphold before
    /// construction.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        category: Category,
        statement: impl Into<String>,
        prior_confidence: f64,
    ) -> Self {
        let statement = statement.into();
        assert!(!statement.is_empty(), "hypothesis statement must be non-empty");
        assert!(
            (0.0..=1.0).contains(&prior_confidence),
            "prior_confidence must be in [0, 1]"
        );
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            category,
            statement,
            prior_confidence,
            reinforcement_count: 0,
            status: HypothesisStatus::Active,
        }
    }
}

/// A single observation, pre- or post-verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: String,
    pub source_type: SourceType,
    pub url: String,
    pub observed_at: DateTime<Utc>,
    pub extracted_text: String,
    pub pre_verification_credibility: f64,
    pub post_verification_credibility: f64,
    pub accessible: bool,
    pub content_matches: bool,
    pub verified: bool,
}

impl EvidenceItem {
    /// Fingerprint used for novelty/duplicate detection (§4.5, §4.6). A
    /// cheap content hash, not a cryptographic one — collisions are
    /// acceptable false-positive duplicates, never false negatives for
    /// byte-identical text.
    #[must_use]
    pub fn fingerprint(text: &str) -> String {
        let normalized: String = text
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| !c.is_whitespace())
            .collect();
        format!("{:x}", fnv1a(normalized.as_bytes()))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// The five exhaustive decision classes (§4.5, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    WeakAccept,
    Reject,
    NoProgress,
    Saturated,
}

/// Per (entity, category) counters driving saturation (§4.6) and the
/// decision rubric's "once per category" rule (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub accept: u32,
    pub weak_accept: u32,
    pub reject: u32,
    pub no_progress: u32,
    pub saturated: u32,
    pub saturation_score: f64,
    pub last_two_decisions: Vec<Decision>,
    pub accepted_signals: u32,
    /// Whether a WEAK_ACCEPT has already been granted once for this
    /// category under the "new but missing two or more criteria" rule.
    pub weak_accept_once_used: bool,
}

impl CategoryStats {
    pub fn total(&self) -> u32 {
        self.accept + self.weak_accept + self.reject + self.no_progress + self.saturated
    }

    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Accept => self.accept += 1,
            Decision::WeakAccept => self.weak_accept += 1,
            Decision::Reject => self.reject += 1,
            Decision::NoProgress => self.no_progress += 1,
            Decision::Saturated => self.saturated += 1,
        }
        self.last_two_decisions.push(decision);
        if self.last_two_decisions.len() > 2 {
            self.last_two_decisions.remove(0);
        }
    }

    pub fn is_saturated(&self) -> bool {
        self.saturation_score >= 0.7
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    Active,
    Cooling,
    Blacklisted,
}

/// Per-(entity-run, source type) blacklist entry (§4.7). Discarded at the
/// end of each entity run — never persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub failure_count: u32,
    pub success_count: u32,
    pub consecutive_failures: u32,
    pub status: ChannelStatus,
}

impl Default for ChannelEntry {
    fn default() -> Self {
        Self {
            failure_count: 0,
            success_count: 0,
            consecutive_failures: 0,
            status: ChannelStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelBlacklist {
    pub channels: HashMap<SourceType, ChannelEntry>,
}

impl ChannelBlacklist {
    pub fn entry(&mut self, source: SourceType) -> &mut ChannelEntry {
        self.channels.entry(source).or_default()
    }

    /// A failure attributed to `source` (§4.7): 2 consecutive → COOLING, 3
    /// consecutive → BLACKLISTED for the remainder of this run.
    pub fn record_failure(&mut self, source: SourceType) {
        let entry = self.entry(source);
        entry.failure_count += 1;
        entry.consecutive_failures += 1;
        entry.status = match entry.consecutive_failures {
            0..=1 => ChannelStatus::Active,
            2 => ChannelStatus::Cooling,
            _ => ChannelStatus::Blacklisted,
        };
    }

    /// Any success resets the channel to ACTIVE.
    pub fn record_success(&mut self, source: SourceType) {
        let entry = self.entry(source);
        entry.success_count += 1;
        entry.consecutive_failures = 0;
        entry.status = ChannelStatus::Active;
    }

    pub fn penalty(&self, source: SourceType) -> f64 {
        match self.channels.get(&source).map(|e| e.status) {
            Some(ChannelStatus::Active) | None => 0.0,
            Some(ChannelStatus::Cooling) => 0.5,
            Some(ChannelStatus::Blacklisted) => 1.0,
        }
    }
}

/// Per-entity working state exclusively owned by the Exploration Loop for
/// the duration of a run (§3 Ownership).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RalphState {
    pub entity_id: String,
    /// Invariant: `confidence ∈ [0.05, min(0.95, confidence_ceiling)]`.
    pub confidence: f64,
    pub iterations_completed: u32,
    pub confidence_history: Vec<f64>,
    pub categories: HashMap<Category, CategoryStats>,
    /// Owns this entity's hypothesis set (§4.4): the category-diversity
    /// rule, reinforcement, and retirement all go through this store
    /// rather than a raw `Vec` the loop could push unmanaged records into.
    pub hypothesis_store: HypothesisStore,
    pub blacklist: ChannelBlacklist,
    pub seen_evidences: HashSet<String>,
    /// Evidence accepted or weakly-accepted per category, accumulated
    /// across iterations so a validated candidate can be corroborated by
    /// distinct observations rather than one observation repeated.
    pub category_evidence: HashMap<Category, Vec<EvidenceItem>>,
    pub confidence_ceiling: f64,
    pub category_saturated: bool,
    pub confidence_saturated: bool,
    pub global_saturated: bool,
    pub is_actionable: bool,
    pub accepted_count_total: u32,
    pub categories_with_accepts: HashSet<Category>,
}

impl RalphState {
    #[must_use]
    pub fn new(entity_id: impl Into<String>, starting_confidence: f64, ceiling: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            confidence: starting_confidence.clamp(0.05, ceiling.min(0.95)),
            iterations_completed: 0,
            confidence_history: vec![starting_confidence],
            categories: HashMap::new(),
            hypothesis_store: HypothesisStore::new(),
            blacklist: ChannelBlacklist::default(),
            seen_evidences: HashSet::new(),
            category_evidence: HashMap::new(),
            confidence_ceiling: ceiling,
            category_saturated: false,
            confidence_saturated: false,
            global_saturated: false,
            is_actionable: false,
            accepted_count_total: 0,
            categories_with_accepts: HashSet::new(),
        }
    }

    pub fn category_stats_mut(&mut self, category: Category) -> &mut CategoryStats {
        self.categories.entry(category).or_default()
    }

    /// Active hypotheses for this entity, read through the owning store
    /// (§4.4).
    #[must_use]
    pub fn active_hypotheses(&self) -> Vec<&Hypothesis> {
        self.hypothesis_store.by_entity(&self.entity_id, true)
    }

    /// No confidence gain > 0.01 over the last 10 iterations (§4.9 early
    /// stop).
    #[must_use]
    pub fn has_stalled(&self) -> bool {
        let n = self.confidence_history.len();
        if n < 11 {
            return false;
        }
        let window_start = self.confidence_history[n - 11];
        let max_in_window = self.confidence_history[n - 10..]
            .iter()
            .copied()
            .fold(f64::MIN, f64::max);
        max_in_window - window_start <= 0.01
    }

    /// Confidence has converged to its ceiling: ceiling damping has fully
    /// choked off further gain (§4.6's `ceiling_damping` goes to 0 once
    /// `current_confidence == ceiling`). Distinct from `category_saturated`
    /// (per-category signal exhaustion) and `global_saturated` (majority of
    /// categories exhausted) — this flag tracks the confidence scalar
    /// itself, not category accounting.
    pub fn recompute_confidence_saturation(&mut self) {
        let ceiling = self.confidence_ceiling.min(0.95);
        self.confidence_saturated = self.confidence >= ceiling - 1e-9;
    }

    pub fn recompute_global_saturation(&mut self) {
        let active: Vec<&CategoryStats> = self.categories.values().collect();
        if active.is_empty() {
            self.global_saturated = false;
            return;
        }
        let saturated = active.iter().filter(|c| c.is_saturated()).count();
        self.global_saturated = saturated * 2 >= active.len();
    }
}

/// State after threshold crossing, before validation (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCandidate {
    pub candidate_id: String,
    pub entity_id: String,
    pub category: Category,
    pub evidence: Vec<EvidenceItem>,
    pub raw_confidence: f64,
    pub temporal_multiplier: f64,
    pub primary_reason: Option<String>,
    pub validated: bool,
    pub validation_pass: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityTier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

impl PriorityTier {
    #[must_use]
    pub fn from_fit_score(fit_score: f64) -> Self {
        if fit_score >= 90.0 {
            PriorityTier::Tier1
        } else if fit_score >= 70.0 {
            PriorityTier::Tier2
        } else if fit_score >= 50.0 {
            PriorityTier::Tier3
        } else {
            PriorityTier::Tier4
        }
    }
}

/// Immutable, four-pass-verified output — the core's only authoritative
/// signal (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedSignal {
    pub signal_id: String,
    pub entity_id: String,
    pub category: Category,
    pub confidence_before: f64,
    pub confidence_after: f64,
    pub verified_evidence: Vec<EvidenceItem>,
    pub validation_pass: u8,
    pub validated_at: DateTime<Utc>,
    pub temporal_multiplier: f64,
    pub fit_score: f64,
    pub priority_tier: PriorityTier,
    pub primary_reason: Option<String>,
    pub urgency: Option<String>,
    pub requires_manual_review: bool,
}

/// Deterministic signal id, idempotency key for the Signal Store Gateway
/// (§4.10): `hash(entity_id, category, canonical(claim))`.
#[must_use]
pub fn signal_id(entity_id: &str, category: Category, canonical_claim: &str) -> String {
    let mut buf = String::with_capacity(entity_id.len() + canonical_claim.len() + 16);
    buf.push_str(entity_id);
    buf.push('|');
    buf.push_str(&format!("{category:?}"));
    buf.push('|');
    buf.push_str(canonical_claim);
    format!("{:016x}", fnv1a(buf.as_bytes()))
}

/// Canonicalizes a claim's keyword set for duplicate detection (§4.8 Pass
/// 4, §9 Open Questions: keyword set is primary, cosine is an optional
/// secondary check).
#[must_use]
pub fn canonicalize_claim(text: &str) -> String {
    let mut words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .collect();
    words.sort_unstable();
    words.dedup();
    words.join(" ")
}
