// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! A canned-response provider for tests, mirroring a real vendor's shape
//! without any network I/O.

use std::sync::Mutex;

use ralph_core::llm::{LlmError, LlmProvider, LlmRequest, LlmResponse};

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: f64,
}

impl MockResponse {
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self { content: content.into(), tokens_in: 10, tokens_out: 10, cost_usd: 0.0001 }
    }
}

/// Replays a fixed queue of responses in order, looping the last one once
/// exhausted. Records every request it received for assertions.
pub struct MockProvider {
    name: String,
    responses: Mutex<Vec<MockResponse>>,
    cursor: Mutex<usize>,
    received: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    #[must_use]
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses),
            cursor: Mutex::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, responses: Vec<MockResponse>) -> Self {
        Self { name: name.into(), ..Self::new(responses) }
    }

    #[must_use]
    pub fn requests_received(&self) -> usize {
        self.received.lock().expect("mock provider lock poisoned").len()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_identity(&self) -> &str {
        "mock-model"
    }

    fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.received
            .lock()
            .expect("mock provider lock poisoned")
            .push(request.clone());

        let responses = self.responses.lock().expect("mock provider lock poisoned");
        if responses.is_empty() {
            return Err(LlmError::RequestFailed {
                provider: self.name.clone(),
                message: "no canned responses configured".to_string(),
            });
        }
        let mut cursor = self.cursor.lock().expect("mock provider lock poisoned");
        let index = (*cursor).min(responses.len() - 1);
        *cursor += 1;
        let canned = &responses[index];

        Ok(LlmResponse {
            content: canned.content.clone(),
            tokens_in: canned.tokens_in,
            tokens_out: canned.tokens_out,
            cost_usd: canned.cost_usd,
            model_used: self.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_replays_queued_responses_in_order() {
        let provider = MockProvider::new(vec![
            MockResponse::content("first"),
            MockResponse::content("second"),
        ]);
        let req = LlmRequest::new("q", 10);
        assert_eq!(provider.complete(&req).unwrap().content, "first");
        assert_eq!(provider.complete(&req).unwrap().content, "second");
        assert_eq!(provider.requests_received(), 2);
    }
}
