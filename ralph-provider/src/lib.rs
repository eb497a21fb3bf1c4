// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Concrete `LlmProvider` and `SearchClient` implementations for the Ralph
//! discovery engine.
//!
//! The `LlmProvider`/`SearchClient` traits are defined in `ralph-core`;
//! this crate provides the implementations.
//!
//! # Available providers
//!
//! - [`AnthropicProvider`] — Claude API.
//! - [`OpenAiProvider`] — GPT API.
//! - [`MockProvider`] — canned responses, for tests.
//! - [`BraveSearchClient`] — web search.
//! - [`MockSearchClient`] — canned search results, for tests.

mod anthropic;
mod common;
mod factory;
mod mock;
mod openai;
mod search;

pub use anthropic::AnthropicProvider;
pub use common::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, HttpProviderConfig,
    OpenAiCompatibleProvider, estimate_cost,
};
pub use factory::{can_create_provider, create_provider};
pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAiProvider;
pub use search::{BraveSearchClient, MockSearchClient};
