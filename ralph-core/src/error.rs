// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Error taxonomy (§7). Kinds, not type names per component — every
//! component's fallible operations return a variant of `RalphError`.

use thiserror::Error;

/// Errors produced anywhere in the exploration/validation pipeline.
#[derive(Debug, Error)]
pub enum RalphError {
    /// Malformed entity id, missing configuration. Fatal to the run.
    #[error("invalid input: {0}")]
    InputError(String),

    /// Search/fetch network failures, LLM provider 5xx. Recovered locally
    /// with bounded retry, then demoted to NO_PROGRESS for that channel.
    #[error("transient external error calling {origin}: {message}")]
    TransientExternalError { origin: String, message: String },

    /// LLM quota exhausted or cost cap reached.
    #[error("provider budget exhausted: {0}")]
    ProviderBudgetError(String),

    /// URL unreachable or content mismatch. Never fatal on its own.
    #[error("verification failure for {url}: {reason}")]
    VerificationFailure { url: String, reason: String },

    /// Candidate failed one of the four validation passes.
    #[error("validation rejected at pass {pass}: {reason}")]
    ValidationReject { pass: u8, reason: String },

    /// Signal store unreachable after retries. Fatal to the current entity
    /// run.
    #[error("store write error for signal {signal_id}: {message}")]
    StoreWriteError { signal_id: String, message: String },

    /// Cooperative cancellation requested.
    #[error("cancellation requested")]
    CancellationRequested,
}

impl RalphError {
    /// Whether this error is fatal to the current entity run (bubbles to
    /// the Scheduler) as opposed to recoverable locally (§7 propagation
    /// policy).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RalphError::InputError(_)
                | RalphError::ProviderBudgetError(_)
                | RalphError::StoreWriteError { .. }
                | RalphError::CancellationRequested
        )
    }

    /// CLI exit code per §6.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            RalphError::InputError(_) => 2,
            RalphError::ProviderBudgetError(_) => 3,
            RalphError::StoreWriteError { .. } => 5,
            _ => 1,
        }
    }
}

pub type RalphResult<T> = Result<T, RalphError>;
