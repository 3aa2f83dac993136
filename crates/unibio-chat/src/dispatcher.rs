//! Tool dispatch strategies
//!
//! The orchestration loop only sees [`ToolDispatcher`]. Which backend sits
//! behind it is decided once, at construction time, from `AppConfig`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use unibio_core::{AppConfig, DispatchBackend, ToolCallRequest, ToolResult};
use unibio_llm::FunctionDeclaration;
use unibio_tools::{ToolExecutor, ToolRegistry};

use crate::http_dispatcher::HttpDispatcher;

/// Executes tool calls on behalf of the orchestration loop
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    fn backend(&self) -> DispatchBackend;

    /// Run one call. Never fails: every fault is folded into the result.
    async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> ToolResult;

    /// Advisory readiness probe
    async fn health_check(&self) -> bool;

    async fn execute_request(&self, request: &ToolCallRequest) -> ToolResult {
        self.execute(&request.name, &request.arguments).await
    }
}

pub type SharedDispatcher = Arc<dyn ToolDispatcher>;

/// In-process dispatch through the tool executor
#[derive(Clone)]
pub struct DirectDispatcher {
    executor: Arc<ToolExecutor>,
}

impl DirectDispatcher {
    pub fn new(executor: Arc<ToolExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }
}

#[async_trait]
impl ToolDispatcher for DirectDispatcher {
    fn backend(&self) -> DispatchBackend {
        DispatchBackend::Direct
    }

    async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> ToolResult {
        self.executor.execute(name, arguments).await
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Build the dispatcher selected by `config.backend`.
///
/// Both backends share the same registry: the direct one executes it, the
/// HTTP one uses it to pick per-tool timeouts.
pub fn build_dispatcher(
    config: &AppConfig,
    executor: Arc<ToolExecutor>,
) -> anyhow::Result<SharedDispatcher> {
    let dispatcher: SharedDispatcher = match config.backend {
        DispatchBackend::Direct => Arc::new(DirectDispatcher::new(executor)),
        DispatchBackend::Http => Arc::new(HttpDispatcher::from_config(
            config,
            executor.registry().clone(),
        )?),
    };
    info!("Tool dispatch backend: {}", dispatcher.backend());
    Ok(dispatcher)
}

/// Function declarations advertised to the model, in registry order
pub fn function_declarations(registry: &ToolRegistry) -> Vec<FunctionDeclaration> {
    registry
        .list_tools()
        .into_iter()
        .map(|schema| FunctionDeclaration {
            parameters: schema.parameters_json(),
            name: schema.name,
            description: schema.description,
        })
        .collect()
}
