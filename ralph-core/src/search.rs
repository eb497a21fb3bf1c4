// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The `SearchClient` trait seam (component 1). Concrete implementations
//! live in `ralph-provider`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Success,
    Empty,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub results: Vec<SearchResultItem>,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: SearchStatus,
    pub content: String,
    pub final_url: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed after retries: {0}")]
    RetriesExhausted(String),
}

pub trait SearchClient: Send + Sync {
    /// Must return `status=empty` (not raise) when a query yields zero
    /// results, and never retry more than a small bounded number of times
    /// before returning `status=error` (§4.1).
    fn search(&self, query: &str, engine: &str, num_results: u32) -> SearchResponse;

    fn fetch_markdown(&self, url: &str) -> FetchResponse;

    /// Bounded-concurrency batch fetch.
    fn batch_fetch(&self, urls: &[String]) -> Vec<FetchResponse> {
        urls.iter().map(|u| self.fetch_markdown(u)).collect()
    }
}
