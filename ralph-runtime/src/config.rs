// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Layered configuration for the Ralph runtime: defaults, overridden by an
//! optional `ralph.toml`, overridden by `RALPH_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ralph_core::config::RalphConfig;

use crate::error::RuntimeError;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: SocketAddr,
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".parse().expect("valid default address"), max_body_size: 10 * 1024 * 1024 }
    }
}

/// Where the runtime keeps its two persistent stores (§6): the validated
/// signal graph and the per-entity checkpoint blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub signal_store_path: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub run_log_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            signal_store_path: PathBuf::from("ralph-data/signals.json"),
            checkpoint_dir: PathBuf::from("ralph-data/checkpoints"),
            run_log_dir: PathBuf::from("ralph-data/runs"),
        }
    }
}

/// Scheduler/Orchestrator knobs (§4.12) not already owned by `RalphConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Bound on concurrent entity runs (§5 default: 8).
    pub concurrency: usize,
    /// Bounded-retry attempts before a `StoreWriteError` fails the run.
    pub store_retry_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { concurrency: 8, store_retry_attempts: 3 }
    }
}

/// Root runtime configuration: the core's `RalphConfig` plus the ambient
/// process-level concerns (`ralph-core` knows nothing about HTTP or disk
/// paths).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ralph: RalphConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Loads configuration layered as: compiled-in defaults, then an
    /// optional `ralph.toml` in the working directory, then `RALPH_*`
    /// environment variables (e.g. `RALPH_HTTP__BIND`).
    pub fn load() -> Result<Self, RuntimeError> {
        let defaults = serde_json::to_value(Config::default()).map_err(RuntimeError::Serialization)?;
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&defaults).map_err(|e| RuntimeError::Config(e.to_string()))?)
            .add_source(config::File::with_name("ralph").required(false))
            .add_source(config::Environment::with_prefix("RALPH").separator("__"));

        let layered = builder.build().map_err(|e| RuntimeError::Config(e.to_string()))?;
        layered.try_deserialize().map_err(|e| RuntimeError::Config(e.to_string()))
    }
}
