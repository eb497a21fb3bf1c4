// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The temporal multiplier (§4.8): seasonality, recurrence, and momentum
//! sub-factors, each clamped to `[0.9, 1.15]`, multiplied together, then
//! clamped to the overall `[0.75, 1.40]` range. Absent historical data
//! defaults the multiplier to 1.0.

use ralph_core::config::TemporalConfig;

const SUB_FACTOR_MIN: f64 = 0.9;
const SUB_FACTOR_MAX: f64 = 1.15;
const MULTIPLIER_MIN: f64 = 0.75;
const MULTIPLIER_MAX: f64 = 1.40;

/// A single past signal event, used to compute the three sub-factors.
#[derive(Debug, Clone, Copy)]
pub struct HistoricalEvent {
    pub days_ago: i64,
}

fn clamp_sub_factor(x: f64) -> f64 {
    x.clamp(SUB_FACTOR_MIN, SUB_FACTOR_MAX)
}

/// Fraction of known historical signals that fell within the current
/// quarter (approximated as the most recent `seasonality_window_days`),
/// mapped into the sub-factor range around 1.0.
#[must_use]
pub fn seasonality_factor(history: &[HistoricalEvent], config: &TemporalConfig) -> f64 {
    if history.is_empty() {
        return 1.0;
    }
    let in_window = history
        .iter()
        .filter(|e| e.days_ago <= i64::from(config.seasonality_window_days))
        .count();
    let fraction = in_window as f64 / history.len() as f64;
    clamp_sub_factor(0.9 + fraction * 0.25)
}

/// `(expected_interval - days_since_last) / stdev`, mapped into the
/// sub-factor range: a signal arriving right on schedule gets no boost; one
/// arriving earlier than expected (recurrence pressure building) gets a
/// mild boost.
#[must_use]
pub fn recurrence_factor(expected_interval_days: f64, days_since_last: f64, stdev_days: f64) -> f64 {
    if stdev_days <= 0.0 {
        return 1.0;
    }
    let z = (expected_interval_days - days_since_last) / stdev_days;
    clamp_sub_factor(1.0 + z * 0.05)
}

/// Momentum: count of recent activity events within the two momentum
/// windows (default 30/90 days), normalized against a baseline rate.
#[must_use]
pub fn momentum_factor(history: &[HistoricalEvent], config: &TemporalConfig) -> f64 {
    if history.is_empty() {
        return 1.0;
    }
    let [short_window, long_window] = config.momentum_windows_days;
    let short_count = history.iter().filter(|e| e.days_ago <= i64::from(short_window)).count();
    let long_count = history.iter().filter(|e| e.days_ago <= i64::from(long_window)).count();
    if long_count == 0 {
        return 1.0;
    }
    let short_rate = short_count as f64 / f64::from(short_window);
    let long_rate = long_count as f64 / f64::from(long_window);
    if long_rate <= 0.0 {
        return 1.0;
    }
    clamp_sub_factor(short_rate / long_rate)
}

/// The full temporal multiplier: product of the three sub-factors (each
/// already clamped), then clamped to the overall range. Returns 1.0 when
/// `history` is empty (no historical data available).
#[must_use]
pub fn temporal_multiplier(
    history: &[HistoricalEvent],
    expected_interval_days: f64,
    days_since_last: f64,
    stdev_days: f64,
    config: &TemporalConfig,
) -> f64 {
    if history.is_empty() {
        return 1.0;
    }
    let product = seasonality_factor(history, config)
        * recurrence_factor(expected_interval_days, days_since_last, stdev_days)
        * momentum_factor(history, config);
    product.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX)
}
