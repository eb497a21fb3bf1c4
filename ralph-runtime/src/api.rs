// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! OpenAPI schema definitions for the Ralph runtime.

use utoipa::OpenApi;

use crate::error::RuntimeErrorResponse;

/// OpenAPI schema for the Ralph runtime API.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health,
        crate::handlers::ready,
        crate::handlers::submit_run,
        crate::handlers::run_status,
        crate::handlers::export_entity,
    ),
    components(schemas(RuntimeErrorResponse)),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "runs", description = "Entity run submission, status, and export"),
    ),
    info(
        title = "Ralph Runtime API",
        description = "HTTP API for the procurement-signal discovery engine",
        version = "0.1.0",
        contact(
            name = "Ralph",
            url = "https://github.com/aprio-one/ralph",
        ),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
)]
pub struct ApiDoc;
