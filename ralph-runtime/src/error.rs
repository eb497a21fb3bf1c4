// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! Error types for the Ralph runtime: wraps `RalphError` (§7) with the
//! HTTP status mapping and CLI exit codes the runtime surfaces need.

use ralph_core::error::RalphError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Runtime-level errors: the core's error taxonomy plus the concerns that
/// only exist at the process boundary (config, I/O, unknown run ids).
#[derive(Debug, Error, ToSchema)]
#[schema(as = RuntimeErrorResponse)]
pub enum RuntimeError {
    /// A `RalphError` raised by the exploration/validation pipeline.
    #[error("ralph error: {0}")]
    Ralph(#[from] RalphError),

    /// Serialization error (config, checkpoint, or signal store JSON).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error reading/writing a checkpoint, signal store, or config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Layered configuration failed to load.
    #[error("configuration error: {0}")]
    Config(String),

    /// `status`/`export` referenced a run id with no checkpoint on disk.
    #[error("not found: {0}")]
    NotFound(String),
}

impl RuntimeError {
    /// CLI exit code (§6): 0 success is the non-error path, so this only
    /// covers the failure codes `RalphError` doesn't already classify.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            RuntimeError::Ralph(e) => e.exit_code(),
            RuntimeError::NotFound(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Error response body for the HTTP API.
#[derive(Debug, Serialize, ToSchema)]
pub struct RuntimeErrorResponse {
    pub error: String,
    pub status: u16,
}

impl axum::response::IntoResponse for RuntimeError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            RuntimeError::Ralph(RalphError::InputError(_)) => axum::http::StatusCode::BAD_REQUEST,
            RuntimeError::Ralph(RalphError::ProviderBudgetError(_)) => {
                axum::http::StatusCode::PAYLOAD_TOO_LARGE
            }
            RuntimeError::Ralph(RalphError::StoreWriteError { .. }) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
            RuntimeError::Ralph(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            RuntimeError::Serialization(_) => axum::http::StatusCode::BAD_REQUEST,
            RuntimeError::Io(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            RuntimeError::Config(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            RuntimeError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
        };
        let body = RuntimeErrorResponse { error: self.to_string(), status: status.as_u16() };
        (status, axum::Json(body)).into_response()
    }
}
