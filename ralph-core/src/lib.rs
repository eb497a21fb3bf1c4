// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Core data model, decision rubric, and confidence calculus for the
//! procurement-signal discovery engine.
//!
//! # Modules
//!
//! - [`model`]: entities, hypotheses, evidence, per-category stats, the
//!   per-entity working state (`RalphState`), and the two signal shapes.
//! - [`config`]: the full configuration surface.
//! - [`rubric`]: the Decision Rubric — a pure classification function.
//! - [`confidence`]: the Confidence Engine — decision-class accounting,
//!   ceiling damping, the actionable gate, saturation scoring.
//! - [`hypothesis_store`]: per-entity hypothesis set with the
//!   category-diversity rule.
//! - [`hop`]: the Hop Planner — channel scoring and query templates.
//! - [`llm`]: the `LlmProvider` trait seam and cascade logic.
//! - [`search`]: the `SearchClient` trait seam.
//! - [`context`]: `RunContext`, threaded explicitly through every
//!   component instead of process-global state.
//! - [`error`]: the error taxonomy (§7).

pub mod confidence;
pub mod config;
pub mod context;
pub mod error;
pub mod hop;
pub mod hypothesis_store;
pub mod llm;
pub mod model;
pub mod rubric;
pub mod search;

pub use config::RalphConfig;
pub use context::RunContext;
pub use error::{RalphError, RalphResult};
pub use model::{
    CategoryStats, ChannelBlacklist, Decision, Entity, EvidenceItem, Hypothesis, PriorityTier,
    RalphState, SignalCandidate, ValidatedSignal,
};
