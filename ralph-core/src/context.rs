// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! `RunContext`: config, cost counters, and client handles threaded
//! through every component explicitly — no process-global singletons
//! (§9 Design Notes).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RalphConfig;

/// Per-run cost accounting. `cost_micros` avoids floating point drift
/// across many small increments; exposed as dollars via `cost_usd`.
#[derive(Debug, Default)]
pub struct CostCounter {
    cost_micros: AtomicU64,
}

impl CostCounter {
    pub fn add(&self, usd: f64) {
        let micros = (usd * 1_000_000.0).round() as u64;
        self.cost_micros.fetch_add(micros, Ordering::Relaxed);
    }

    #[must_use]
    pub fn total_usd(&self) -> f64 {
        self.cost_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

/// Cooperative cancellation flag, checked at every suspension point (§5).
#[derive(Debug, Default)]
pub struct CancellationFlag {
    cancelled: std::sync::atomic::AtomicBool,
}

impl CancellationFlag {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Carries configuration, per-run cost/cancellation state, threaded
/// through every component of a single entity run.
pub struct RunContext {
    pub config: RalphConfig,
    pub cost: CostCounter,
    pub cancellation: CancellationFlag,
}

impl RunContext {
    #[must_use]
    pub fn new(config: RalphConfig) -> Self {
        Self {
            config,
            cost: CostCounter::default(),
            cancellation: CancellationFlag::default(),
        }
    }

    #[must_use]
    pub fn over_budget(&self) -> bool {
        self.cost.total_usd() >= self.config.exploration.max_cost_per_entity_usd
    }
}
