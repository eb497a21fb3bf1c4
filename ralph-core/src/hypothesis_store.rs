// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The Hypothesis Store (§4.4): per-entity hypothesis set with the
//! category-diversity rule (at most two active hypotheses per category).

use serde::{Deserialize, Serialize};

use crate::model::{Hypothesis, HypothesisStatus};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HypothesisStore {
    hypotheses: Vec<Hypothesis>,
}

impl HypothesisStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hypothesis, enforcing the category-diversity rule: a third
    /// active hypothesis in a category retires the oldest active one in
    /// that category first.
    pub fn add(&mut self, hypothesis: Hypothesis) {
        let entity_id = hypothesis.entity_id.clone();
        let category = hypothesis.category;
        let active_in_category: Vec<usize> = self
            .hypotheses
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                h.entity_id == entity_id
                    && h.category == category
                    && h.status == HypothesisStatus::Active
            })
            .map(|(i, _)| i)
            .collect();

        if active_in_category.len() >= 2 {
            let oldest = active_in_category[0];
            self.hypotheses[oldest].status = HypothesisStatus::Retired;
        }
        self.hypotheses.push(hypothesis);
    }

    pub fn reinforce(&mut self, hypothesis_id: &str) {
        if let Some(h) = self.hypotheses.iter_mut().find(|h| h.id == hypothesis_id) {
            h.reinforcement_count += 1;
            h.prior_confidence += (1.0 - h.prior_confidence) * 0.1;
        }
    }

    pub fn retire(&mut self, hypothesis_id: &str, reason: &str) {
        if let Some(h) = self.hypotheses.iter_mut().find(|h| h.id == hypothesis_id) {
            tracing::debug!(hypothesis_id, reason, "retiring hypothesis");
            h.status = HypothesisStatus::Retired;
        }
    }

    #[must_use]
    pub fn by_entity(&self, entity_id: &str, active_only: bool) -> Vec<&Hypothesis> {
        self.hypotheses
            .iter()
            .filter(|h| {
                h.entity_id == entity_id
                    && (!active_only || h.status == HypothesisStatus::Active)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn third_hypothesis_in_category_retires_oldest() {
        let mut store = HypothesisStore::new();
        store.add(Hypothesis::new("h1", "e1", Category::Crm, "first", 0.2));
        store.add(Hypothesis::new("h2", "e1", Category::Crm, "second", 0.2));
        store.add(Hypothesis::new("h3", "e1", Category::Crm, "third", 0.2));

        let active = store.by_entity("e1", true);
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|h| h.id != "h1"));
    }

    #[test]
    fn reinforce_nudges_prior_toward_one() {
        let mut store = HypothesisStore::new();
        store.add(Hypothesis::new("h1", "e1", Category::Crm, "stmt", 0.5));
        store.reinforce("h1");
        let h = store.by_entity("e1", true)[0];
        assert!((h.prior_confidence - 0.55).abs() < 1e-9);
        assert_eq!(h.reinforcement_count, 1);
    }

    #[test]
    #[tracing_test::traced_test]
    fn retire_logs_the_hypothesis_id_and_reason() {
        let mut store = HypothesisStore::new();
        store.add(Hypothesis::new("h1", "e1", Category::Crm, "stmt", 0.5));
        store.retire("h1", "category saturated");
        assert!(logs_contain("category saturated"));
        assert!(logs_contain("h1"));
    }
}
