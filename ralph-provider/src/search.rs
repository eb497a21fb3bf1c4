// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! HTTP-backed `SearchClient` implementation (Brave Search API shape) plus
//! a canned `MockSearchClient` for tests.

use ralph_core::search::{FetchResponse, SearchClient, SearchResponse, SearchResultItem, SearchStatus};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

/// Bounded retry count before a search call degrades to `status=error`
/// (§4.1 contract — never retry indefinitely).
const MAX_RETRIES: u32 = 2;

/// Search and fetch calls are bounded suspension points (§5).
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BraveSearchClient {
    api_key: String,
    client: reqwest::blocking::Client,
    base_url: String,
}

impl BraveSearchClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::blocking::Client::builder()
                .timeout(SEARCH_TIMEOUT)
                .build()
                .expect("reqwest client with timeout config builds"),
            base_url: "https://api.search.brave.com/res/v1".to_string(),
        }
    }

    /// # Errors
    /// Returns an error string if `BRAVE_API_KEY` is unset.
    pub fn from_env() -> Result<Self, String> {
        let api_key = std::env::var("BRAVE_API_KEY").map_err(|_| "BRAVE_API_KEY not set".to_string())?;
        Ok(Self::new(api_key))
    }

    fn search_once(&self, query: &str, num_results: u32) -> Result<Vec<SearchResultItem>, String> {
        let response = self
            .client
            .get(format!("{}/web/search", self.base_url))
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", &num_results.to_string())])
            .send()
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let parsed: BraveResponse = response.json().map_err(|e| e.to_string())?;
        Ok(parsed
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, r)| SearchResultItem {
                title: r.title,
                url: r.url,
                snippet: r.description.unwrap_or_default(),
                position: i as u32,
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    description: Option<String>,
}

impl SearchClient for BraveSearchClient {
    fn search(&self, query: &str, _engine: &str, num_results: u32) -> SearchResponse {
        let mut attempts = 0;
        loop {
            match self.search_once(query, num_results) {
                Ok(results) if results.is_empty() => {
                    return SearchResponse { status: SearchStatus::Empty, results, cost_usd: 0.0 };
                }
                Ok(results) => {
                    return SearchResponse { status: SearchStatus::Success, results, cost_usd: 0.002 };
                }
                Err(message) => {
                    attempts += 1;
                    tracing::warn!(query, attempts, %message, "search attempt failed");
                    if attempts > MAX_RETRIES {
                        return SearchResponse { status: SearchStatus::Error, results: Vec::new(), cost_usd: 0.0 };
                    }
                }
            }
        }
    }

    fn fetch_markdown(&self, url: &str) -> FetchResponse {
        match self.client.get(url).send() {
            Ok(response) if response.status().is_success() => {
                let final_url = response.url().to_string();
                match response.text() {
                    Ok(content) => FetchResponse { status: SearchStatus::Success, content, final_url },
                    Err(_) => FetchResponse { status: SearchStatus::Error, content: String::new(), final_url: url.to_string() },
                }
            }
            _ => FetchResponse { status: SearchStatus::Error, content: String::new(), final_url: url.to_string() },
        }
    }
}

/// Canned search client for tests: returns a fixed queue of responses per
/// query, recording every call for assertions.
pub struct MockSearchClient {
    queued: Mutex<Vec<SearchResponse>>,
    fetch_queued: Mutex<Vec<FetchResponse>>,
    queries_seen: Mutex<Vec<String>>,
}

impl MockSearchClient {
    #[must_use]
    pub fn new(queued: Vec<SearchResponse>, fetch_queued: Vec<FetchResponse>) -> Self {
        Self {
            queued: Mutex::new(queued),
            fetch_queued: Mutex::new(fetch_queued),
            queries_seen: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn queries_seen(&self) -> Vec<String> {
        self.queries_seen.lock().expect("mock lock poisoned").clone()
    }
}

impl SearchClient for MockSearchClient {
    fn search(&self, query: &str, _engine: &str, _num_results: u32) -> SearchResponse {
        self.queries_seen.lock().expect("mock lock poisoned").push(query.to_string());
        let mut queued = self.queued.lock().expect("mock lock poisoned");
        if queued.is_empty() {
            return SearchResponse { status: SearchStatus::Empty, results: Vec::new(), cost_usd: 0.0 };
        }
        queued.remove(0)
    }

    fn fetch_markdown(&self, url: &str) -> FetchResponse {
        let mut queued = self.fetch_queued.lock().expect("mock lock poisoned");
        if queued.is_empty() {
            return FetchResponse { status: SearchStatus::Error, content: String::new(), final_url: url.to_string() };
        }
        queued.remove(0)
    }
}
