//! Chat Router - HTTP endpoints for the conversational agent
//!
//! This module exports a router that can be mounted by unibio-http.
//! NO server code here - just route definitions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::sessions::SessionManager;

pub const MAX_MESSAGE_CHARS: usize = 10_000;
pub const MAX_ITERATIONS_LIMIT: usize = 20;

/// Chat service state
#[derive(Clone)]
pub struct ChatState {
    pub sessions: Arc<SessionManager>,
}

impl ChatState {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

/// Create the chat router
pub fn create_router(state: ChatState) -> Router {
    Router::new()
        .route("/", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/models", get(models_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/:session_id", delete(delete_session_handler))
        .with_state(state)
}

/// Service info for unibio-http ServiceRouter trait
pub struct ChatServiceRouter;

impl unibio_http::router::ServiceRouter for ChatServiceRouter {
    fn prefix() -> &'static str {
        "/api/chat"
    }

    fn name() -> &'static str {
        "chat"
    }

    fn description() -> &'static str {
        "Conversational agent with tool calling"
    }
}

// === Handlers ===

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

impl ChatRequestBody {
    /// Trimmed message, or the reason it was rejected
    pub fn validated_message(&self) -> Result<&str, String> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err("Message cannot be empty".to_string());
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(format!(
                "Message too long (max {} characters)",
                MAX_MESSAGE_CHARS
            ));
        }
        if let Some(n) = self.max_iterations {
            if n == 0 || n > MAX_ITERATIONS_LIMIT {
                return Err(format!(
                    "max_iterations must be between 1 and {} (got {})",
                    MAX_ITERATIONS_LIMIT, n
                ));
            }
        }
        Ok(message)
    }
}

fn unprocessable(detail: String) -> axum::response::Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": detail })),
    )
        .into_response()
}

async fn chat_handler(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequestBody>,
) -> axum::response::Response {
    let message = match request.validated_message() {
        Ok(message) => message.to_string(),
        Err(detail) => {
            debug!("Rejected chat request: {}", detail);
            return unprocessable(detail);
        }
    };

    let (session_id, agent) = state
        .sessions
        .get_or_create(request.session_id.clone(), request.model.as_deref())
        .await;

    let mut agent = agent.lock().await;
    if let Some(ref model) = request.model {
        if model != agent.model() {
            agent.switch_model(model.clone());
        }
    }
    let max_iterations = request.max_iterations.unwrap_or(agent.max_iterations());

    info!(session = %session_id, "Chat request");
    let reply = agent.send_message(&message, max_iterations).await;
    drop(agent);

    let mut body = serde_json::to_value(&reply).unwrap_or_else(|_| json!({}));
    if let Value::Object(ref mut map) = body {
        map.insert("session_id".to_string(), json!(session_id));
    }
    (StatusCode::OK, Json(body)).into_response()
}

async fn health_handler(State(state): State<ChatState>) -> impl IntoResponse {
    let factory = state.sessions.factory();
    Json(json!({
        "status": "healthy",
        "service": "chat",
        "provider": factory.provider().provider_name(),
        "default_model": factory.default_model(),
        "dispatch_backend": factory.dispatcher().backend().to_string(),
        "tool_service_healthy": factory.dispatcher().health_check().await,
        "sessions": state.sessions.len().await,
    }))
}

async fn models_handler(State(state): State<ChatState>) -> impl IntoResponse {
    let factory = state.sessions.factory();
    match factory.provider().list_models().await {
        Ok(models) => (
            StatusCode::OK,
            Json(json!({
                "default": factory.default_model(),
                "models": models,
            })),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": format!("{:#}", e) })),
        ),
    }
}

async fn list_sessions_handler(State(state): State<ChatState>) -> impl IntoResponse {
    let sessions = state.sessions.list().await;
    Json(json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

async fn delete_session_handler(
    State(state): State<ChatState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    if state.sessions.remove(&session_id).await {
        (
            StatusCode::OK,
            Json(json!({ "deleted": true, "session_id": session_id })),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Session not found: {}", session_id) })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: &str, max_iterations: Option<usize>) -> ChatRequestBody {
        ChatRequestBody {
            message: message.to_string(),
            model: None,
            session_id: None,
            max_iterations,
        }
    }

    #[test]
    fn test_message_validation() {
        assert_eq!(body("  hello \n", None).validated_message(), Ok("hello"));
        assert_eq!(
            body("   ", None).validated_message(),
            Err("Message cannot be empty".to_string())
        );
        assert_eq!(
            body(&"a".repeat(10_001), None).validated_message(),
            Err("Message too long (max 10000 characters)".to_string())
        );
        assert!(body(&"é".repeat(10_000), None).validated_message().is_ok());
        assert!(body("hi", Some(0)).validated_message().is_err());
        assert!(body("hi", Some(21)).validated_message().is_err());
        assert!(body("hi", Some(20)).validated_message().is_ok());
    }
}
