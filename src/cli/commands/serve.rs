//! HTTP API server for integration with other systems.
//!
//! Exposes the chat session and the summarizer as JSON endpoints. The server
//! holds a single chat session; turns against it are serialized.

use crate::agent::{CollectingObserver, ThoughtEvent};
use crate::chat::{Message, Route, Session, TurnRouter};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::ScoutError;
use crate::fetch::validate_url;
use crate::summarize::SummarizePipeline;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    settings: Settings,
    prompts: Prompts,
    /// Key given on the command line or via the environment.
    api_key: Option<String>,
    session: Mutex<Session>,
}

impl AppState {
    fn new(settings: Settings, prompts: Prompts, api_key: Option<String>) -> Self {
        let session = Session::new(&prompts.chat.greeting);
        Self {
            settings,
            prompts,
            api_key,
            session: Mutex::new(session),
        }
    }

    /// Request key, then server key, then config file key.
    fn resolve_api_key(&self, request_key: Option<&str>) -> Result<String, ApiError> {
        let request_key = request_key.filter(|k| !k.trim().is_empty());
        self.settings
            .api_key(request_key.or(self.api_key.as_deref()))
            .ok_or_else(|| {
                ApiError(ScoutError::InvalidInput(
                    "No API key configured. Send api_key with the request or start the server with GROQ_API_KEY set"
                        .to_string(),
                ))
            })
    }
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: &str,
    port: u16,
    api_key: Option<&str>,
    settings: Settings,
) -> anyhow::Result<()> {
    let prompts = Prompts::from_settings(&settings)?;

    if settings.api_key(api_key).is_none() {
        Output::warning("No API key configured; requests must supply api_key.");
    }

    let state = Arc::new(AppState::new(settings, prompts, api_key.map(str::to_string)));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Scout API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /chat");
    Output::kv("Messages", "GET  /messages");
    Output::kv("Summarize", "POST /summarize");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/messages", get(messages))
        .route("/summarize", post(summarize))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    /// Per-request key, used instead of the server's.
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    route: Route,
    failed: bool,
    thoughts: Vec<ThoughtEvent>,
}

#[derive(Serialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct SummarizeRequest {
    url: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
    sources: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A failed request, rendered as `{"error": ...}`.
struct ApiError(ScoutError);

impl From<ScoutError> for ApiError {
    fn from(e: ScoutError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ScoutError::InvalidInput(_) | ScoutError::Config(_) => StatusCode::BAD_REQUEST,
            ScoutError::TranscriptUnavailable(_) | ScoutError::NoContentLoaded(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ScoutError::Fetch(_) | ScoutError::Http(_) | ScoutError::Llm(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ScoutError::InvalidInput("message must not be empty".to_string()).into());
    }

    let api_key = state.resolve_api_key(req.api_key.as_deref())?;
    let router = TurnRouter::from_settings(&state.settings, &state.prompts, &api_key, None)?;

    let mut observer = CollectingObserver::default();
    let mut session = state.session.lock().await;
    let outcome = router.handle_turn(&mut session, message, &mut observer).await;
    info!(route = ?outcome.route, failed = outcome.failed, "Chat turn handled");

    Ok(Json(ChatResponse {
        response: outcome.response,
        route: outcome.route,
        failed: outcome.failed,
        thoughts: observer.events,
    }))
}

async fn messages(State(state): State<Arc<AppState>>) -> Json<MessagesResponse> {
    let session = state.session.lock().await;
    Json(MessagesResponse {
        messages: session.messages().to_vec(),
    })
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    validate_url(&req.url)?;

    let api_key = state.resolve_api_key(req.api_key.as_deref())?;
    let pipeline =
        SummarizePipeline::from_settings(&state.settings, state.prompts.clone(), &api_key, None)?;

    let summary = pipeline.run(&req.url, None).await?;

    Ok(Json(SummarizeResponse {
        summary: summary.text,
        sources: summary.sources,
    }))
}
