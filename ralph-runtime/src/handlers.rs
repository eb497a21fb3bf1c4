// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! HTTP request handlers for the Ralph runtime: health/readiness plus a
//! thin wrapper around the Scheduler's run/status/export operations (§6 —
//! this is the one "CRUD surface" that stays in scope, since it exposes
//! the core's own status/export API rather than an external dossier UI).

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use ralph_core::model::{Entity, ValidatedSignal};
use ralph_domain::priors::Dossier;

use crate::error::RuntimeError;
use crate::scheduler::RunSummary;
use crate::state::AppState;

/// Request body for `POST /api/v1/runs`. Mirrors the core's own types
/// (`Entity`, `Dossier`) rather than a bespoke DTO, since this endpoint is
/// a thin wrapper around the Scheduler, not an external-facing surface.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub entity: Entity,
    #[serde(default)]
    pub dossier: Option<Dossier>,
    #[serde(default)]
    pub force: bool,
    pub max_iterations: Option<u32>,
}

/// Health check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Server is healthy", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness check.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses((status = 200, description = "Server is ready", body = serde_json::Value))
)]
pub async fn ready() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ready", "services": {"scheduler": "ok"}}))
}

/// Submit an entity run (§6 `run --entity`/`run --batch` over HTTP).
#[utoipa::path(
    post,
    path = "/api/v1/runs",
    tag = "runs",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Run completed", body = serde_json::Value),
        (status = 400, description = "Invalid input", body = crate::error::RuntimeErrorResponse),
        (status = 413, description = "Cost cap hit", body = crate::error::RuntimeErrorResponse),
        (status = 500, description = "Store write failure", body = crate::error::RuntimeErrorResponse)
    )
)]
pub async fn submit_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunSummary>, RuntimeError> {
    let span = info_span!("submit_run", entity_id = %request.entity.id);
    let _guard = span.enter();
    info!("received run request");
    drop(_guard);

    let summary = state
        .scheduler
        .run_entity(request.entity, request.dossier, request.force, true, request.max_iterations)
        .await?;
    Ok(Json(summary))
}

/// `status --run <id>` (§6): last recorded run summary for an entity.
#[utoipa::path(
    get,
    path = "/api/v1/runs/{entity_id}",
    tag = "runs",
    params(("entity_id" = String, Path, description = "Entity id")),
    responses(
        (status = 200, description = "Run summary", body = serde_json::Value),
        (status = 404, description = "No run recorded", body = crate::error::RuntimeErrorResponse)
    )
)]
pub async fn run_status(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<RunSummary>, RuntimeError> {
    Ok(Json(state.scheduler.status(&entity_id)?))
}

/// `export --entity <id>` (§6): dumps `RalphState` + validated signals.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub state: Option<ralph_core::model::RalphState>,
    pub signals: Vec<ValidatedSignal>,
}

#[utoipa::path(
    get,
    path = "/api/v1/entities/{entity_id}/export",
    tag = "runs",
    params(("entity_id" = String, Path, description = "Entity id")),
    responses((status = 200, description = "Exported state and signals", body = serde_json::Value))
)]
pub async fn export_entity(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<ExportResponse>, RuntimeError> {
    let bundle = state.scheduler.export(&entity_id)?;
    Ok(Json(ExportResponse { state: bundle.state, signals: bundle.signals }))
}

/// Build the HTTP router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/api/v1/runs", post(submit_run))
        .route("/api/v1/runs/{entity_id}", get(run_status))
        .route("/api/v1/entities/{entity_id}/export", get(export_entity))
}
