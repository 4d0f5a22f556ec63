//! HTTP surface using Axum.

use crate::config::ServerConfig;
use crate::conversation::Session;
use crate::error::{RagError, Result};
use crate::pipeline::{DEFAULT_TOP_K, RagPipeline};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the server. One session serves every request.
pub struct AppState {
    pub pipeline: RagPipeline,
    pub session: Session,
    pub top_k: usize,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self {
            pipeline,
            session: Session::new(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RagError::Http(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| RagError::Http(format!("server error: {e}")))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    request: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return error_response(rejection.status(), &rejection.body_text()),
    };

    match state
        .pipeline
        .converse(&request.query, &state.session, state.top_k)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(RagError::EmptyQuery) => error_response(StatusCode::BAD_REQUEST, "Empty query"),
        Err(e) => {
            tracing::error!(error = %e, "ask failed");
            error_response(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
