// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! The CLI surface (§6): `run --entity`/`run --batch`, `status --run`,
//! `export --entity`, plus `serve` to start the HTTP API. Exit codes match
//! §6: 0 success, 2 invalid input, 3 cost cap, 4 iteration cap, 5 store
//! failure.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ralph", about = "Procurement-signal discovery engine", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run exploration for a single entity or a batch file.
    Run(RunArgs),
    /// Report the last recorded run summary for an entity.
    Status {
        #[arg(long = "run")]
        run: String,
    },
    /// Dump the checkpointed state and validated signals for an entity.
    Export {
        #[arg(long)]
        entity: String,
    },
    /// Start the HTTP API server.
    Serve,
}

#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("target").required(true).args(["entity", "batch"])))]
pub struct RunArgs {
    /// Entity id to explore.
    #[arg(long)]
    pub entity: Option<String>,
    /// Entity display name, required alongside `--entity` — the Decision
    /// Rubric's entity-specificity check (§4.5) needs a real name, not an
    /// empty string that would vacuously match every evidence item.
    #[arg(long = "entity-name")]
    pub entity_name: Option<String>,
    /// Path to a JSON file of `{entity, dossier}` records for a batch run.
    #[arg(long)]
    pub batch: Option<std::path::PathBuf>,
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<u32>,
    /// Resume a batch from its checkpoints instead of starting fresh.
    #[arg(long)]
    pub resume: bool,
    /// Bypass the same-day idempotent cache.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_requires_either_entity_or_batch() {
        let result = Cli::try_parse_from(["ralph", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_entity_parses() {
        let cli = Cli::try_parse_from([
            "ralph", "run", "--entity", "e1", "--entity-name", "Example FC", "--max-iterations", "10",
        ])
        .unwrap();
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.entity.as_deref(), Some("e1"));
                assert_eq!(args.entity_name.as_deref(), Some("Example FC"));
                assert_eq!(args.max_iterations, Some(10));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn status_parses() {
        let cli = Cli::try_parse_from(["ralph", "status", "--run", "e1"]).unwrap();
        match cli.command {
            Command::Status { run } => assert_eq!(run, "e1"),
            _ => panic!("expected Status command"),
        }
    }
}
