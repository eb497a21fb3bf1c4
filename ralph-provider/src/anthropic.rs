// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Anthropic Claude API provider.

use std::time::Duration;

use ralph_core::llm::{LlmError, LlmProvider, LlmRequest, LlmResponse};
use serde::{Deserialize, Serialize};

/// LLM calls are bounded suspension points (§5): 60s covers even the
/// slowest cascade tier before the exploration loop's cancellation check
/// would otherwise wait indefinitely.
const LLM_TIMEOUT: Duration = Duration::from_secs(60);

pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    base_url: String,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::blocking::Client::builder()
                .timeout(LLM_TIMEOUT)
                .build()
                .expect("reqwest client with timeout config builds"),
            base_url: "https://api.anthropic.com".into(),
        }
    }

    /// # Errors
    /// Returns `LlmError::NotConfigured` if `ANTHROPIC_API_KEY` is unset.
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::NotConfigured("anthropic".to_string()))?;
        Ok(Self::new(api_key, model))
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    temperature: f64,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model_identity(&self) -> &str {
        &self.model
    }

    fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            messages: vec![Message { role: "user", content: &request.prompt }],
            system: request.system.as_deref(),
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body: AnthropicError = response.json().map_err(|e| LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                message: format!("failed to parse error: {e}"),
            })?;
            return Err(LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                message: error_body.error.message,
            });
        }

        let api_response: AnthropicResponse = response.json().map_err(|e| LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            message: format!("failed to parse response: {e}"),
        })?;

        let content = api_response.content.into_iter().map(|c| c.text).collect::<String>();

        Ok(LlmResponse {
            content,
            tokens_in: api_response.usage.input_tokens,
            tokens_out: api_response.usage.output_tokens,
            cost_usd: crate::common::estimate_cost(
                api_response.usage.input_tokens,
                api_response.usage.output_tokens,
            ),
            model_used: api_response.model,
        })
    }
}
