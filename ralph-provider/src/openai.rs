// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! `OpenAI` GPT API provider.

use ralph_core::llm::{LlmError, LlmProvider, LlmRequest, LlmResponse};

use crate::common::{HttpProviderConfig, OpenAiCompatibleProvider};

pub struct OpenAiProvider {
    config: HttpProviderConfig,
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            config: HttpProviderConfig::new(api_key, model, "https://api.openai.com"),
        }
    }

    /// # Errors
    /// Returns `LlmError::NotConfigured` if `OPENAI_API_KEY` is unset.
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| LlmError::NotConfigured("openai".to_string()))?;
        Ok(Self::new(api_key, model))
    }
}

impl OpenAiCompatibleProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn http_config(&self) -> &HttpProviderConfig {
        &self.config
    }

    fn endpoint(&self) -> &str {
        "/v1/chat/completions"
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model_identity(&self) -> &str {
        &self.config.model
    }

    fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.complete_openai_compatible(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_reports_its_own_identity() {
        let provider = OpenAiProvider::new("test-key", "gpt-4o-mini");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model_identity(), "gpt-4o-mini");
    }
}
