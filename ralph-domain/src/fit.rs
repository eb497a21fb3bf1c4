// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Fit score (GLOSSARY): 0-100 score mapping a validated signal to an
//! internal service catalog. Weights: service match 40, budget 25,
//! timeline 15, entity size 10, geography 10.

/// Inputs to the fit-score calculation, each a 0-1 sub-score already
/// normalized by the caller against the internal service catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitInputs {
    pub service_match: f64,
    pub budget_fit: f64,
    pub timeline_fit: f64,
    pub entity_size_fit: f64,
    pub geography_fit: f64,
}

const SERVICE_MATCH_WEIGHT: f64 = 40.0;
const BUDGET_WEIGHT: f64 = 25.0;
const TIMELINE_WEIGHT: f64 = 15.0;
const ENTITY_SIZE_WEIGHT: f64 = 10.0;
const GEOGRAPHY_WEIGHT: f64 = 10.0;

/// Computes the 0-100 fit score from normalized 0-1 sub-scores.
#[must_use]
pub fn fit_score(inputs: FitInputs) -> f64 {
    let raw = inputs.service_match.clamp(0.0, 1.0) * SERVICE_MATCH_WEIGHT
        + inputs.budget_fit.clamp(0.0, 1.0) * BUDGET_WEIGHT
        + inputs.timeline_fit.clamp(0.0, 1.0) * TIMELINE_WEIGHT
        + inputs.entity_size_fit.clamp(0.0, 1.0) * ENTITY_SIZE_WEIGHT
        + inputs.geography_fit.clamp(0.0, 1.0) * GEOGRAPHY_WEIGHT;
    raw.clamp(0.0, 100.0)
}
