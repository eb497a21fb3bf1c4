// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Common abstractions for HTTP-based LLM providers, reducing duplication
//! across vendor integrations.

use std::time::Duration;

use ralph_core::llm::{LlmError, LlmRequest, LlmResponse};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

/// LLM calls are bounded suspension points (§5).
const LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Base configuration for an OpenAI-compatible HTTP provider.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub client: Client,
}

impl HttpProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            client: Client::builder()
                .timeout(LLM_TIMEOUT)
                .build()
                .expect("reqwest client with timeout config builds"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ChatCompletionRequest {
    #[must_use]
    pub fn from_llm_request(model: impl Into<String>, request: &LlmRequest) -> Self {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(&request.prompt));
        Self {
            model: model.into(),
            messages,
            max_tokens: request.max_tokens,
            temperature: 0.2,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ChatChoiceMessage {
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: ChatUsage,
}

/// Per-token pricing used to estimate `cost_usd` until real billing data is
/// wired up; conservative blended rate across the cascade tiers.
const USD_PER_1K_TOKENS: f64 = 0.003;

#[must_use]
pub fn estimate_cost(prompt_tokens: u32, completion_tokens: u32) -> f64 {
    f64::from(prompt_tokens + completion_tokens) / 1000.0 * USD_PER_1K_TOKENS
}

/// # Errors
/// Returns `LlmError::RequestFailed` if the response carries no choices.
pub fn chat_response_to_llm_response(
    provider: &str,
    response: ChatCompletionResponse,
) -> Result<LlmResponse, LlmError> {
    let choice = response.choices.into_iter().next().ok_or_else(|| LlmError::RequestFailed {
        provider: provider.to_string(),
        message: "no choices in response".to_string(),
    })?;
    Ok(LlmResponse {
        content: choice.message.content,
        tokens_in: response.usage.prompt_tokens,
        tokens_out: response.usage.completion_tokens,
        cost_usd: estimate_cost(response.usage.prompt_tokens, response.usage.completion_tokens),
        model_used: response.model,
    })
}

/// # Errors
/// Returns `LlmError::RequestFailed` on network failure, non-success
/// status, or an unparseable response body.
pub fn make_chat_completion_request(
    provider: &str,
    config: &HttpProviderConfig,
    endpoint: &str,
    request: ChatCompletionRequest,
) -> Result<LlmResponse, LlmError> {
    let url = format!("{}{}", config.base_url, endpoint);
    let http_response = config
        .client
        .post(&url)
        .header("Authorization", format!("Bearer {}", config.api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .map_err(|e| LlmError::RequestFailed {
            provider: provider.to_string(),
            message: format!("request failed: {e}"),
        })?;

    let status = http_response.status();
    if !status.is_success() {
        return Err(LlmError::RequestFailed {
            provider: provider.to_string(),
            message: format!("HTTP {status}"),
        });
    }

    let api_response: ChatCompletionResponse = http_response.json().map_err(|e| LlmError::RequestFailed {
        provider: provider.to_string(),
        message: format!("failed to parse response: {e}"),
    })?;

    chat_response_to_llm_response(provider, api_response)
}

/// Reduces boilerplate for providers whose wire format matches the
/// OpenAI chat-completions shape.
pub trait OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str;
    fn http_config(&self) -> &HttpProviderConfig;
    fn endpoint(&self) -> &str;

    fn complete_openai_compatible(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let chat_request = ChatCompletionRequest::from_llm_request(self.http_config().model.clone(), request);
        make_chat_completion_request(self.provider_name(), self.http_config(), self.endpoint(), chat_request)
    }
}
