// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The `LlmProvider` trait seam (component 2) and the cascade that tries
//! small → medium → large until a response is sufficient (§4.2). Concrete
//! providers live in `ralph-provider`; this crate only defines the
//! contract and the cascade logic against it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ModelTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub max_tokens: u32,
    /// Whether the caller expects a schema-parseable response (affects the
    /// sufficiency predicate).
    pub expects_schema: bool,
}

impl LlmRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens,
            expects_schema: false,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn expecting_schema(mut self) -> Self {
        self.expects_schema = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: f64,
    pub model_used: String,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    RequestFailed { provider: String, message: String },
    #[error("every model in the cascade was exhausted")]
    ExhaustedCascade,
    #[error("provider {0} is not configured (missing credentials)")]
    NotConfigured(String),
}

/// Implemented by every concrete vendor integration in `ralph-provider`.
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model_identity(&self) -> &str;

    /// # Errors
    /// Returns `LlmError::RequestFailed` on any provider-side failure
    /// (network, auth, 5xx).
    fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

/// Apology/refusal markers the sufficiency predicate screens for (§4.2).
const REFUSAL_MARKERS: [&str; 6] = [
    "i cannot",
    "i can't",
    "i'm sorry",
    "as an ai",
    "i am unable",
    "i do not have access",
];

/// `_is_sufficient(result)`: non-empty content; parseable when a schema is
/// expected; no apology/refusal patterns.
#[must_use]
pub fn is_sufficient(response: &LlmResponse, request: &LlmRequest) -> bool {
    let trimmed = response.content.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if REFUSAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    if request.expects_schema && serde_json::from_str::<serde_json::Value>(trimmed).is_err() {
        return false;
    }
    true
}

/// Tries each `(tier, provider)` pair in cascade order, returning the
/// first sufficient response. Exhausts to `LlmError::ExhaustedCascade`
/// only when every model failed or was insufficient (§4.2).
pub fn query_with_cascade(
    request: &LlmRequest,
    providers: &[(ModelTier, &dyn LlmProvider)],
) -> Result<LlmResponse, LlmError> {
    for (_, provider) in providers {
        match provider.complete(request) {
            Ok(response) if is_sufficient(&response, request) => return Ok(response),
            Ok(_) | Err(_) => continue,
        }
    }
    Err(LlmError::ExhaustedCascade)
}
