//! Tools Router - HTTP endpoints for the tool catalog
//!
//! This module exports a router that can be mounted by unibio-http. The
//! HTTP dispatch backend talks to these endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::executor::ToolExecutor;
use crate::tool::BoxedTool;

/// Tools service state
#[derive(Clone)]
pub struct ToolsState {
    pub executor: Arc<ToolExecutor>,
}

impl ToolsState {
    pub fn new(executor: Arc<ToolExecutor>) -> Self {
        Self { executor }
    }
}

/// Create the tools router
///
/// Mount this at `/api/tools` in the unified server:
/// ```ignore
/// use unibio_http::prelude::*;
/// use unibio_tools::router::{create_router, ToolsState};
///
/// let state = ToolsState::new(executor);
/// let router = RouterBuilder::new()
///     .nest("/api/tools", "tools", create_router(state))
///     .build();
/// ```
pub fn create_router(state: ToolsState) -> Router {
    Router::new()
        .route("/", get(list_tools_handler))
        .route("/health", get(health_handler))
        .route("/:name", get(get_tool_handler))
        .route("/:name/execute", post(execute_tool_handler))
        .with_state(state)
}

/// Service info for unibio-http ServiceRouter trait
pub struct ToolsServiceRouter;

impl unibio_http::router::ServiceRouter for ToolsServiceRouter {
    fn prefix() -> &'static str {
        "/api/tools"
    }

    fn name() -> &'static str {
        "tools"
    }

    fn description() -> &'static str {
        "Molecular-biology tool catalog and execution"
    }
}

fn describe(tool: &BoxedTool) -> Value {
    json!({
        "name": tool.name(),
        "description": tool.description(),
        "category": tool.category(),
        "latency": tool.latency(),
        "parameters": tool.schema().parameters_json(),
    })
}

// === Handlers ===

async fn health_handler(State(state): State<ToolsState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "tools",
        "tool_count": state.executor.registry().len(),
    }))
}

async fn list_tools_handler(State(state): State<ToolsState>) -> impl IntoResponse {
    let tools: Vec<Value> = state.executor.registry().tools().iter().map(describe).collect();
    Json(json!({
        "count": tools.len(),
        "tools": tools,
    }))
}

async fn get_tool_handler(
    State(state): State<ToolsState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.executor.registry().resolve(&name) {
        Some(tool) => (StatusCode::OK, Json(describe(&tool))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Tool not found: {}", name) })),
        ),
    }
}

async fn execute_tool_handler(
    State(state): State<ToolsState>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    let arguments = match body {
        Some(Json(Value::Object(map))) => map,
        _ => Map::new(),
    };

    let status = if state.executor.registry().contains(&name) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };

    let result = state.executor.execute(&name, &arguments).await;
    info!(
        tool = %name,
        success = result.success,
        elapsed_ms = result.execution_time_ms,
        "Tool executed via HTTP"
    );
    (status, Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::executor;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(ToolsState::new(Arc::new(executor())))
    }

    async fn call(req: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_and_health() {
        let (status, body) = call(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 10);
        assert_eq!(body["tools"][0]["name"], "design_primers");
        assert_eq!(body["tools"][6]["latency"], "slow");

        let (_, body) = call(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tool_count"], 10);
    }

    #[tokio::test]
    async fn test_get_tool() {
        let (status, body) = call(Request::get("/analyze_primer").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parameters"]["required"], json!(["sequence"]));

        let (status, _) = call(Request::get("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_execute() {
        let req = Request::post("/check_specificity/execute")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"primer_seq": "GAATTC", "template_seq": "AAAGAATTCAAA"}).to_string(),
            ))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["payload"]["count"], 2);

        let req = Request::post("/bogus/execute")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "unknown function: bogus");
    }
}
