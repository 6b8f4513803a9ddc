//! Concierge HTTP API
//!
//! Axum server fronting the browser-automation and avatar providers.
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! returning `(StatusCode, Value)`, so the logic is testable without router
//! dispatch.
//!
//! Endpoints:
//! - GET  /                                 - front-end entry page
//! - GET  /static/*                         - front-end assets
//! - GET  /api/health                       - liveness and tracked session
//! - POST /api/tavus/session                - create an avatar conversation
//! - GET  /api/tavus/conversation/:id       - fetch an avatar conversation
//! - GET  /api/tavus/replicas               - list avatar replicas
//! - GET  /api/tavus/personas               - list avatar personas
//! - POST /api/process_intent               - classify an utterance
//! - POST /api/run                          - dispatch a browser task
//! - GET  /api/task/:task_id                - provider task passthrough
//! - POST /api/task/:task_id/stop           - stop a running task
//! - GET  /api/session/:session_id          - provider session passthrough

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use concierge_core::{
    classify, AutomationProvider, BrowserUseClient, ConciergeConfig, ConciergeError,
    ConversationProvider, ConversationRequest, TavusClient,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::subsystems::session::SessionManager;

/// Shared state for all HTTP handlers
pub struct AppState {
    pub config: ConciergeConfig,
    pub sessions: SessionManager,
    /// `None` when no avatar credential is configured.
    pub tavus: Option<Arc<dyn ConversationProvider>>,
}

impl AppState {
    pub fn new(
        config: ConciergeConfig,
        automation: Arc<dyn AutomationProvider>,
        tavus: Option<Arc<dyn ConversationProvider>>,
    ) -> Self {
        Self {
            config,
            sessions: SessionManager::new(automation),
            tavus,
        }
    }

    /// Build the provider clients described by `config`.
    ///
    /// Fails if the automation credential is missing. A missing avatar
    /// credential only disables the conversational endpoints.
    pub fn from_config(config: ConciergeConfig) -> std::result::Result<Self, ConciergeError> {
        let api_key = config.require_browser_use_key()?;
        let automation = BrowserUseClient::from_config(api_key, &config.browser_use)?;

        let tavus: Option<Arc<dyn ConversationProvider>> = if config.tavus_api_key().is_some() {
            Some(Arc::new(TavusClient::from_config(&config.tavus)?))
        } else {
            tracing::warn!("TAVUS_API_KEY not set, conversational endpoints are disabled");
            None
        };

        Ok(Self::new(config, Arc::new(automation), tavus))
    }

    fn automation(&self) -> &Arc<dyn AutomationProvider> {
        self.sessions.provider()
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = PathBuf::from(&state.config.http.static_dir);
    let index = static_dir.join("index.html");

    Router::new()
        .route_service("/", ServeFile::new(index))
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/api/health", get(health_handler))
        .route("/api/tavus/session", post(tavus_session_handler))
        .route(
            "/api/tavus/conversation/:conversation_id",
            get(conversation_handler),
        )
        .route("/api/tavus/replicas", get(replicas_handler))
        .route("/api/tavus/personas", get(personas_handler))
        .route("/api/process_intent", post(process_intent_handler))
        .route("/api/run", post(run_handler))
        .route("/api/task/:task_id", get(task_handler))
        .route("/api/task/:task_id/stop", post(stop_task_handler))
        .route("/api/session/:session_id", get(session_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Concierge HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub task: String,
}

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub query: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct TavusSessionRequest {
    pub replica_id: Option<String>,
    pub persona_id: Option<String>,
    pub conversation_name: Option<String>,
    pub context: Option<String>,
    pub properties: Option<Map<String, Value>>,
}

/// Error body. The front-end reads `detail`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { detail: msg.into() }
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health - reports configuration and the tracked session.
pub async fn health_inner(state: &AppState) -> (StatusCode, Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "automation_provider": state.automation().name(),
            "tavus_configured": state.tavus.is_some(),
            "active_session": state.sessions.active().await,
        }),
    )
}

/// Inner intent classification (pure, no remote call).
pub fn process_intent_inner(req: IntentRequest) -> Value {
    to_body(&classify(&req.query))
}

/// Inner run - reuse or create a session, then submit the task into it.
pub async fn run_inner(state: &AppState, req: RunRequest) -> (StatusCode, Value) {
    if req.task.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "task field is required");
    }

    match state.sessions.run_task(&req.task).await {
        Ok(dispatch) => (StatusCode::OK, to_body(&dispatch)),
        Err(e) => remote_failure("run task", e),
    }
}

pub async fn task_inner(state: &AppState, task_id: &str) -> (StatusCode, Value) {
    match state.automation().get_task(task_id).await {
        Ok(task) => (StatusCode::OK, to_body(&task)),
        Err(e) => remote_failure("get task", e),
    }
}

pub async fn stop_task_inner(state: &AppState, task_id: &str) -> (StatusCode, Value) {
    match state.automation().stop_task(task_id).await {
        Ok(task) => (StatusCode::OK, to_body(&task)),
        Err(e) => remote_failure("stop task", e),
    }
}

pub async fn session_inner(state: &AppState, session_id: &str) -> (StatusCode, Value) {
    match state.automation().get_session(session_id).await {
        Ok(session) => (StatusCode::OK, to_body(&session)),
        Err(e) => remote_failure("get session", e),
    }
}

/// Inner avatar session - resolves replica and persona against the
/// configured defaults. No outbound call is made unless a credential is
/// configured and a replica id is resolvable.
pub async fn tavus_session_inner(state: &AppState, req: TavusSessionRequest) -> (StatusCode, Value) {
    let Some(tavus) = state.tavus.as_ref() else {
        return tavus_not_configured();
    };

    let replica_id = non_empty(req.replica_id)
        .or_else(|| state.config.default_replica_id().map(str::to_string));
    let persona_id = non_empty(req.persona_id)
        .or_else(|| state.config.default_persona_id().map(str::to_string));

    tracing::debug!(
        replica_id = replica_id.as_deref().unwrap_or(""),
        persona_id = persona_id.as_deref().unwrap_or(""),
        "Creating avatar conversation"
    );

    let Some(replica_id) = replica_id else {
        return error(StatusCode::BAD_REQUEST, "Replica ID required");
    };

    let request = ConversationRequest::new(replica_id)
        .persona_id(persona_id)
        .conversation_name(req.conversation_name)
        .context(req.context)
        .properties(req.properties);

    match tavus.create_conversation(&request).await {
        Ok(conversation) => (StatusCode::OK, to_body(&conversation)),
        Err(e) => remote_failure("create conversation", e),
    }
}

pub async fn conversation_inner(state: &AppState, conversation_id: &str) -> (StatusCode, Value) {
    let Some(tavus) = state.tavus.as_ref() else {
        return tavus_not_configured();
    };

    match tavus.get_conversation(conversation_id).await {
        Ok(conversation) => (StatusCode::OK, to_body(&conversation)),
        Err(e) => remote_failure("get conversation", e),
    }
}

pub async fn replicas_inner(state: &AppState) -> (StatusCode, Value) {
    let Some(tavus) = state.tavus.as_ref() else {
        return tavus_not_configured();
    };

    match tavus.list_replicas().await {
        Ok(replicas) => (StatusCode::OK, Value::Array(replicas)),
        Err(e) => remote_failure("list replicas", e),
    }
}

pub async fn personas_inner(state: &AppState) -> (StatusCode, Value) {
    let Some(tavus) = state.tavus.as_ref() else {
        return tavus_not_configured();
    };

    match tavus.list_personas().await {
        Ok(personas) => (StatusCode::OK, Value::Array(personas)),
        Err(e) => remote_failure("list personas", e),
    }
}

// ============================================================================
// Axum handler wrappers (thin - delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn process_intent_handler(Json(req): Json<IntentRequest>) -> impl IntoResponse {
    (StatusCode::OK, Json(process_intent_inner(req)))
}

pub async fn run_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunRequest>,
) -> impl IntoResponse {
    let (status, body) = run_inner(&state, req).await;
    (status, Json(body))
}

pub async fn task_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(task_id): UrlPath<String>,
) -> impl IntoResponse {
    let (status, body) = task_inner(&state, &task_id).await;
    (status, Json(body))
}

pub async fn stop_task_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(task_id): UrlPath<String>,
) -> impl IntoResponse {
    let (status, body) = stop_task_inner(&state, &task_id).await;
    (status, Json(body))
}

pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(session_id): UrlPath<String>,
) -> impl IntoResponse {
    let (status, body) = session_inner(&state, &session_id).await;
    (status, Json(body))
}

pub async fn tavus_session_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TavusSessionRequest>,
) -> impl IntoResponse {
    let (status, body) = tavus_session_inner(&state, req).await;
    (status, Json(body))
}

pub async fn conversation_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(conversation_id): UrlPath<String>,
) -> impl IntoResponse {
    let (status, body) = conversation_inner(&state, &conversation_id).await;
    (status, Json(body))
}

pub async fn replicas_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = replicas_inner(&state).await;
    (status, Json(body))
}

pub async fn personas_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status, body) = personas_inner(&state).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

fn error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Value) {
    (status, to_body(&ErrorResponse::new(msg)))
}

/// Every provider failure is a 500 carrying the provider's error text.
fn remote_failure(operation: &str, e: ConciergeError) -> (StatusCode, Value) {
    tracing::error!(operation, error = %e, "Provider call failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn tavus_not_configured() -> (StatusCode, Value) {
    error(StatusCode::INTERNAL_SERVER_ERROR, "Tavus API Key not configured")
}

fn to_body<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize response body");
        serde_json::json!({"detail": "failed to serialize response"})
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ============================================================================
// Unit Tests - call inner functions directly
// ============================================================================
