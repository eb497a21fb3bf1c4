// Copyright 2024-2025 Aprio One AB, Sweden
// SPDX-License-Identifier: MIT
// See LICENSE file in the project root for full license information.

//! HTTP server implementation using Axum.

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::ApiDoc;
use crate::config::HttpConfig;
use crate::error::RuntimeError;
use crate::handlers;
use crate::state::AppState;

/// HTTP server for the Ralph runtime.
pub struct HttpServer {
    config: HttpConfig,
    state: AppState,
}

impl HttpServer {
    #[must_use]
    pub fn new(config: HttpConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP server.
    pub async fn start(self) -> Result<(), RuntimeError> {
        let addr = self.config.bind;
        info!(%addr, "Starting HTTP server");

        let app = Router::new()
            .merge(handlers::router())
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .with_state(self.state)
            .layer(
                ServiceBuilder::new()
                    .layer(
                        TraceLayer::new_for_http()
                            .make_span_with(|request: &axum::http::Request<_>| {
                                tracing::span!(
                                    Level::INFO,
                                    "http_request",
                                    method = %request.method(),
                                    uri = %request.uri(),
                                )
                            })
                            .on_response(
                                |response: &axum::response::Response<_>,
                                 latency: std::time::Duration,
                                 _span: &tracing::Span| {
                                    tracing::event!(
                                        Level::INFO,
                                        latency_ms = latency.as_millis(),
                                        status = %response.status(),
                                        "HTTP response"
                                    );
                                },
                            ),
                    )
                    .layer(CompressionLayer::new())
                    .layer(CorsLayer::permissive()),
            );

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "HTTP server listening");

        axum::serve(listener, app).await?;

        Ok(())
    }
}
