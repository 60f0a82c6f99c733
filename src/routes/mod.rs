use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::ApiError;
use crate::llm::{build_prompt, context_message, AnthropicClient, DirectoryOutcome};
use crate::models::directory::QueryResult;
use crate::models::{ChatRequest, ChatResponse};
use crate::router::DirectoryRouter;

/// Application version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<DirectoryRouter>,
    pub llm: Arc<AnthropicClient>,
    pub config: Arc<Config>,
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
}

/// Chat and raw query routes
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/query", post(query_handler))
        .with_state(state)
}

/// GET / - Service banner
async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Tenant Query Agent is running",
        "version": VERSION
    }))
}

/// GET /api/health - Liveness with timestamp
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

fn require_message(request: &ChatRequest) -> Result<&str, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::ValidationError("Message is required".to_string()));
    }
    Ok(message)
}

/// Run `analyze()` under the configured timeout
async fn run_directory_query(state: &AppState, message: &str) -> DirectoryOutcome {
    if !state.router.configured() {
        return DirectoryOutcome::NotConfigured;
    }

    let secs = state.config.query_timeout;
    match tokio::time::timeout(Duration::from_secs(secs), state.router.analyze(message)).await {
        Ok(result) => {
            tracing::debug!(
                "Directory result: {}",
                serde_json::to_string_pretty(&result).unwrap_or_default()
            );
            DirectoryOutcome::Completed(result)
        }
        Err(_) => {
            tracing::warn!("Directory query timed out after {}s", secs);
            DirectoryOutcome::TimedOut(secs)
        }
    }
}

/// POST /api/chat - Answer a question through the model
///
/// Directory data (or a labelled reason why there is none) is placed into
/// the prompt; the model's first text block is returned.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = require_message(&request)?;
    tracing::info!("Request to /api/chat: {} chars", message.len());

    let outcome = run_directory_query(&state, message).await;
    let prompt = build_prompt(message, &context_message(&outcome));

    let response = state.llm.complete(prompt).await?;
    Ok(Json(ChatResponse { response }))
}

/// POST /api/query - Raw directory result without model formatting
async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    let message = require_message(&request)?;
    tracing::info!("Request to /api/query: {} chars", message.len());

    match run_directory_query(&state, message).await {
        DirectoryOutcome::Completed(result) => Ok(Json(result)),
        DirectoryOutcome::TimedOut(secs) => Err(ApiError::Timeout(secs)),
        DirectoryOutcome::NotConfigured => {
            Ok(Json(crate::error::DirectoryError::NotConfigured.into()))
        }
    }
}
