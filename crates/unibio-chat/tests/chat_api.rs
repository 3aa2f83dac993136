//! Chat router: validation, sessions and replies

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{calls, text, ScriptedProvider};
use unibio_chat::{
    create_router, function_declarations, AgentFactory, ChatState, DirectDispatcher,
    SessionManager,
};

fn app(provider: Arc<ScriptedProvider>) -> (Router, Arc<SessionManager>) {
    let executor = common::executor();
    let factory = AgentFactory::new(
        provider,
        Arc::new(DirectDispatcher::new(executor.clone())),
        function_declarations(executor.registry()),
        "gemini-2.5-flash",
    );
    let sessions = Arc::new(SessionManager::new(factory));
    (create_router(ChatState::new(sessions.clone())), sessions)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_chat_round_trip_with_session() {
    let provider = ScriptedProvider::new(vec![
        calls(&[("analyze_primer", json!({"sequence": "AGCGGATAACAATTTCACACAGG"}))]),
        text("Tm looks fine."),
        text("You're welcome."),
    ]);
    let (app, sessions) = app(provider.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/",
        Some(json!({"message": "  Analyze my M13 primer  "})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Tm looks fine.");
    assert_eq!(body["iterations"], 1);
    assert_eq!(body["function_calls"][0]["function"], "analyze_primer");
    let session_id = body["session_id"].as_str().unwrap().to_string();

    // the first user message was trimmed before it reached the model
    let first = &provider.requests()[0];
    assert_eq!(first.messages[0].text(), "Analyze my M13 primer");

    let (_, body) = send(
        &app,
        "POST",
        "/",
        Some(json!({"message": "thanks", "session_id": session_id})),
    )
    .await;
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["response"], "You're welcome.");
    // same conversation: user, model, tool, model, user
    assert_eq!(provider.requests()[2].messages.len(), 5);
    assert_eq!(sessions.len().await, 1);

    let (status, body) = send(&app, "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = send(&app, "DELETE", &format!("/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "DELETE", &format!("/{}", session_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("Session not found"));
}

#[tokio::test]
async fn test_message_validation_rejects() {
    let provider = ScriptedProvider::new(Vec::new());
    let (app, _) = app(provider.clone());

    let (status, body) = send(&app, "POST", "/", Some(json!({"message": "   "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Message cannot be empty");

    let long = "A".repeat(10_001);
    let (status, _) = send(&app, "POST", "/", Some(json!({"message": long}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, "POST", "/", Some(json!({"text": "missing field"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_model_failure_is_reported_in_body() {
    let provider = ScriptedProvider::new(vec![common::Step::Fail("quota exceeded".into())]);
    let (app, _) = app(provider);

    let (status, body) = send(
        &app,
        "POST",
        "/",
        Some(json!({"message": "hello", "model": "gemini-2.5-pro"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["model"], "gemini-2.5-pro");
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn test_models_and_health() {
    let (app, _) = app(ScriptedProvider::new(Vec::new()));

    let (status, body) = send(&app, "GET", "/models", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["default"], "gemini-2.5-flash");
    assert_eq!(body["models"][0]["id"], "scripted-model");

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dispatch_backend"], "direct");
    assert_eq!(body["tool_service_healthy"], true);
}
