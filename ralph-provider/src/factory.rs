// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Provider factory: builds a concrete `LlmProvider` from a name and model
//! id after the model cascade has already decided which tier to use.

use std::sync::Arc;

use ralph_core::llm::{LlmError, LlmProvider};

use crate::{AnthropicProvider, OpenAiProvider};

/// # Errors
/// Returns `LlmError::NotConfigured` if the named provider's API key is
/// unset, or `LlmError::RequestFailed` if the name is unknown.
pub fn create_provider(provider_name: &str, model_id: &str) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match provider_name {
        "anthropic" => Ok(Arc::new(AnthropicProvider::from_env(model_id)?)),
        "openai" => Ok(Arc::new(OpenAiProvider::from_env(model_id)?)),
        other => Err(LlmError::RequestFailed {
            provider: other.to_string(),
            message: "unknown provider".to_string(),
        }),
    }
}

#[must_use]
pub fn can_create_provider(provider_name: &str) -> bool {
    match provider_name {
        "anthropic" => std::env::var("ANTHROPIC_API_KEY").is_ok(),
        "openai" => std::env::var("OPENAI_API_KEY").is_ok(),
        _ => false,
    }
}
