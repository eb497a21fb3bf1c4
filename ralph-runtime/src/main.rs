// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Ralph CLI/HTTP entry point: wires configuration, providers, and the
//! Scheduler together, then dispatches to the CLI surface (§6).

mod api;
mod cli;
mod config;
mod error;
mod handlers;
mod http;
mod scheduler;
mod state;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ralph_core::config::ModelTier;
use ralph_core::llm::LlmProvider;
use ralph_core::model::Entity;
use ralph_core::search::SearchClient;

use ralph_domain::checkpoint::{CheckpointStore, JsonFileCheckpointStore};
use ralph_domain::priors::Dossier;
use ralph_domain::signal_store::{JsonFileSignalStore, SignalStore};

use cli::{Cli, Command, RunArgs};
use config::Config;
use error::{RuntimeError, RuntimeResult};
use http::HttpServer;
use scheduler::Scheduler;
use state::AppState;

/// One `{entity, dossier?}` record in a `run --batch` input file (§6).
#[derive(Debug, Deserialize)]
struct BatchEntry {
    entity: Entity,
    #[serde(default)]
    dossier: Option<Dossier>,
}

/// Picks the configured provider for a model identity: `anthropic:<id>` or
/// `openai:<id>`, defaulting to `anthropic` when no prefix is given.
fn provider_for_identity(identity: &str) -> RuntimeResult<Arc<dyn LlmProvider>> {
    let (provider_name, model_id) = identity.split_once(':').unwrap_or(("anthropic", identity));
    ralph_provider::create_provider(provider_name, model_id)
        .map_err(|e| RuntimeError::Config(format!("provider {provider_name} unavailable: {e}")))
}

fn build_search_client() -> RuntimeResult<Arc<dyn SearchClient>> {
    ralph_provider::BraveSearchClient::from_env()
        .map(|c| Arc::new(c) as Arc<dyn SearchClient>)
        .map_err(|e| RuntimeError::Config(format!("search client unavailable: {e}")))
}

fn build_scheduler(config: &Config) -> RuntimeResult<Arc<Scheduler>> {
    let search = build_search_client()?;
    let providers = config
        .ralph
        .model_cascade
        .iter()
        .map(|spec| provider_for_identity(&spec.identity).map(|p| (spec.tier, p)))
        .collect::<RuntimeResult<Vec<(ModelTier, Arc<dyn LlmProvider>)>>>()?;

    let signal_store: Arc<dyn SignalStore> = Arc::new(
        JsonFileSignalStore::open(&config.storage.signal_store_path).map_err(RuntimeError::Config)?,
    );
    let checkpoint_store: Arc<dyn CheckpointStore> = Arc::new(
        JsonFileCheckpointStore::open(&config.storage.checkpoint_dir).map_err(RuntimeError::Config)?,
    );
    std::fs::create_dir_all(&config.storage.run_log_dir)?;

    Ok(Arc::new(Scheduler::new(
        config.ralph.clone(),
        search,
        providers,
        signal_store,
        checkpoint_store,
        config.storage.run_log_dir.clone(),
        config.scheduler.concurrency,
        config.scheduler.store_retry_attempts,
    )))
}

fn load_batch(path: &Path) -> RuntimeResult<Vec<BatchEntry>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(RuntimeError::Serialization)
}

async fn run_command(scheduler: Arc<Scheduler>, args: RunArgs) -> RuntimeResult<i32> {
    if let Some(entity_id) = args.entity {
        let Some(entity_name) = args.entity_name else {
            return Err(RuntimeError::Ralph(ralph_core::error::RalphError::InputError(
                "run --entity requires --entity-name".into(),
            )));
        };
        let entity = Entity { id: entity_id, name: entity_name, entity_type: "unknown".into(), priority_score: 50 };
        let summary =
            scheduler.run_entity(entity, None, args.force, true, args.max_iterations).await?;
        info!(?summary, "entity run complete");
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary.exit_code());
    }

    let batch_path = args.batch.expect("clap enforces entity xor batch");
    let entries = load_batch(&batch_path)?;
    let entities = entries.into_iter().map(|e| (e.entity, e.dossier)).collect();
    let results = scheduler.run_batch(entities, args.force, args.resume).await;

    let mut worst_exit = 0;
    for result in results {
        match result {
            Ok(summary) => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                worst_exit = worst_exit.max(summary.exit_code());
            }
            Err(e) => {
                eprintln!("run failed: {e}");
                worst_exit = worst_exit.max(e.exit_code());
            }
        }
    }
    Ok(worst_exit)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let exit_code = match cli.command {
        Command::Run(args) => {
            let scheduler = build_scheduler(&config)?;
            run_command(scheduler, args).await?
        }
        Command::Status { run } => {
            let scheduler = build_scheduler(&config)?;
            match scheduler.status(&run) {
                Ok(summary) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    0
                }
                Err(e) => {
                    eprintln!("{e}");
                    e.exit_code()
                }
            }
        }
        Command::Export { entity } => {
            let scheduler = build_scheduler(&config)?;
            match scheduler.export(&entity) {
                Ok(bundle) => {
                    println!("{}", serde_json::to_string_pretty(&bundle)?);
                    0
                }
                Err(e) => {
                    eprintln!("{e}");
                    e.exit_code()
                }
            }
        }
        Command::Serve => {
            info!("Starting Ralph HTTP runtime");
            let scheduler = build_scheduler(&config)?;
            let state = AppState::new(scheduler);
            let http_server = HttpServer::new(config.http.clone(), state);
            http_server.start().await?;
            0
        }
    };

    std::process::exit(exit_code);
}
