//! Atlas API Server
//!
//! The HTTP surface over the engine: submit queries, manage
//! conversations, read usage stats. Every response body carries an
//! explicit success boolean; failures always include a human-readable
//! message and never a stack trace.
//!
//! # Endpoints
//!
//! - POST /api/query - Submit a query, optionally scoped to a conversation
//! - POST /api/conversations - Create a conversation
//! - GET /api/conversations - List conversations, most recent first
//! - GET /api/conversations/:id - Full conversation detail
//! - GET /api/conversations/:id/stats - Usage metrics
//! - DELETE /api/conversations/:id - Remove a conversation
//! - DELETE /api/conversations - Clear all conversations
//! - GET /health - Liveness probe

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use atlas_engine::agents::AgentRegistry;
use atlas_engine::config::Config;
use atlas_engine::error::EngineError;
use atlas_engine::llm::{
    gemini::GeminiProvider, openai::OpenAiProvider, router::ProviderRouter, ChatProvider,
};
use atlas_engine::orchestrator::Orchestrator;
use atlas_engine::store::ConversationStore;

/// Environment variable holding the Gemini API key
const GEMINI_KEY_VAR: &str = "ATLAS_GEMINI_API_KEY";

/// Environment variable holding the OpenAI API key
const OPENAI_KEY_VAR: &str = "ATLAS_OPENAI_API_KEY";

/// Shared state across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<Mutex<ConversationStore>>,
}

impl AppState {
    /// Build the full engine stack from configuration.
    ///
    /// Providers are registered for every API key present in the
    /// environment; at least one key is required.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut providers: Vec<Box<dyn ChatProvider>> = Vec::new();

        if let Ok(key) = std::env::var(GEMINI_KEY_VAR) {
            providers.push(Box::new(GeminiProvider::new(config.llm.gemini.clone(), key)));
        }
        if let Ok(key) = std::env::var(OPENAI_KEY_VAR) {
            providers.push(Box::new(OpenAiProvider::new(config.llm.openai.clone(), key)));
        }

        if providers.is_empty() {
            anyhow::bail!(
                "No chat provider API key found; set {} or {}",
                GEMINI_KEY_VAR,
                OPENAI_KEY_VAR
            );
        }

        let router = Arc::new(ProviderRouter::new(
            providers,
            config.llm.default_provider.clone(),
            config.llm.timeout_secs,
        ));
        let registry = Arc::new(AgentRegistry::new(&config.agents));

        Ok(Self {
            orchestrator: Arc::new(Orchestrator::new(router, registry)),
            store: Arc::new(Mutex::new(ConversationStore::new(
                config.store.max_conversations,
            ))),
        })
    }
}

/// Error half of the response envelope
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"success": false, "error": self.message})),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::ConversationNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

/// Success half of the response envelope
fn ok(data: impl serde::Serialize) -> Json<serde_json::Value> {
    Json(json!({"success": true, "data": data}))
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/query", post(query_handler))
        .route(
            "/api/conversations",
            post(create_conversation_handler)
                .get(list_conversations_handler)
                .delete(clear_conversations_handler),
        )
        .route(
            "/api/conversations/:id",
            get(get_conversation_handler).delete(delete_conversation_handler),
        )
        .route("/api/conversations/:id/stats", get(stats_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("API server shutting down gracefully");
}

/// Liveness probe
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    conversation_id: Option<String>,
}

/// Submit a user query, optionally scoped to a conversation.
///
/// With a conversation identifier, the run is seeded with that
/// conversation's history and the completed turn is persisted back into
/// it. Unknown identifiers are a 404, never silently created.
async fn query_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = payload.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Missing 'query' field",
        ));
    }

    // Seed history and record the user message before the run, so the
    // conversation reflects the request even if the turn fails.
    let history = match &payload.conversation_id {
        Some(id) => {
            let mut store = state.store.lock().expect("store lock poisoned");
            let history = store.history(id)?;
            store.append_user(id, &query)?;
            history
        }
        None => Vec::new(),
    };

    let outcome = state.orchestrator.run(&query, &history).await?;

    if let Some(id) = &payload.conversation_id {
        let mut store = state.store.lock().expect("store lock poisoned");
        // The conversation may have been evicted while the run was in
        // flight; the answer is still returned to the caller.
        if let Err(e) = store.append_assistant(
            id,
            &outcome.answer,
            outcome.latency_ms,
            outcome.agent_calls.clone(),
        ) {
            tracing::warn!("Could not persist assistant turn: {}", e);
        }
    }

    Ok(ok(outcome))
}

#[derive(Debug, Deserialize, Default)]
struct CreateConversationRequest {
    title: Option<String>,
}

/// Create a conversation
async fn create_conversation_handler(
    State(state): State<AppState>,
    payload: Option<Json<CreateConversationRequest>>,
) -> Json<serde_json::Value> {
    let title = payload.and_then(|Json(p)| p.title);
    let conversation = state
        .store
        .lock()
        .expect("store lock poisoned")
        .create(title);

    tracing::info!("Created conversation {}", conversation.id);
    ok(json!({
        "id": conversation.id,
        "title": conversation.title,
        "createdAt": conversation.created_at,
    }))
}

/// List conversations, most recently updated first
async fn list_conversations_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let listing = state.store.lock().expect("store lock poisoned").list();
    ok(listing)
}

/// Full conversation detail
async fn get_conversation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.lock().expect("store lock poisoned");
    let conversation = store.get(&id)?;
    Ok(ok(conversation))
}

/// Usage metrics for one conversation
async fn stats_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store.lock().expect("store lock poisoned");
    let conversation = store.get(&id)?;

    let stats = &conversation.stats;
    let avg_latency = if stats.queries > 0 {
        stats.total_latency_ms / stats.queries
    } else {
        0
    };

    Ok(ok(json!({
        "messageCount": conversation.messages.len(),
        "avgLatency": avg_latency,
        "agentsUsed": stats.agents_used,
    })))
}

/// Remove one conversation
async fn delete_conversation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .lock()
        .expect("store lock poisoned")
        .remove(&id)?;
    tracing::info!("Deleted conversation {}", id);
    Ok(Json(json!({"success": true})))
}

/// Clear every conversation (conversational reset)
async fn clear_conversations_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.store.lock().expect("store lock poisoned").clear();
    tracing::info!("Cleared all conversations");
    Json(json!({"success": true}))
}
