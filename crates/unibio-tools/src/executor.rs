//! Tool executor with timeout and failure isolation
//!
//! Every call, whatever happens inside the handler, comes back as a
//! well-formed `ToolResult`.

use futures::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::ToolRegistry;
use unibio_core::{AppConfig, LatencyClass, ToolResult};

/// Configuration for tool execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Timeout for local computations
    pub fast_timeout: Duration,
    /// Timeout for tools that call external services
    pub slow_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            fast_timeout: Duration::from_secs(30),
            slow_timeout: Duration::from_secs(60),
        }
    }
}

impl ExecutorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fast_timeout: config.tool_timeout,
            slow_timeout: config.slow_tool_timeout,
        }
    }

    pub fn timeout_for(&self, latency: LatencyClass) -> Duration {
        match latency {
            LatencyClass::Fast => self.fast_timeout,
            LatencyClass::Slow => self.slow_timeout,
        }
    }
}

/// Executes registry tools in-process
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, ExecutorConfig::default())
    }

    /// Execute a tool by name.
    ///
    /// Unknown names, argument decode failures, handler errors, panics and
    /// timeouts all become `success = false` results.
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> ToolResult {
        let start = Instant::now();
        let elapsed = || start.elapsed().as_millis() as u64;

        let Some(tool) = self.registry.resolve(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return ToolResult::error(format!("unknown function: {}", name), elapsed());
        };

        let args = match tool.schema().decode(arguments) {
            Ok(args) => args,
            Err(e) => {
                debug!(tool = %name, error = %e, "Argument decode failed");
                return ToolResult::error(
                    format!("invalid arguments for {}: {}", name, e),
                    elapsed(),
                );
            }
        };

        let limit = self.config.timeout_for(tool.latency());
        debug!(tool = %name, timeout_ms = limit.as_millis() as u64, "Executing tool");

        let call = AssertUnwindSafe(tool.execute(args)).catch_unwind();
        match timeout(limit, call).await {
            Err(_) => {
                let secs = limit.as_secs_f64();
                warn!(tool = %name, "Tool timed out after {}s", secs);
                ToolResult::error(
                    format!("{} timed out after {} seconds", name, secs),
                    elapsed(),
                )
            }
            Ok(Err(panic)) => {
                let msg = panic_message(panic.as_ref());
                warn!(tool = %name, "Tool panicked: {}", msg);
                ToolResult::error(format!("Error executing {}: {}", name, msg), elapsed())
            }
            Ok(Ok(Err(e))) => {
                debug!(tool = %name, error = %e, "Tool returned error");
                ToolResult::error(format!("Error executing {}: {}", name, e), elapsed())
            }
            Ok(Ok(Ok(payload))) => {
                let result = ToolResult::from_payload(payload, elapsed());
                debug!(
                    tool = %name,
                    success = result.success,
                    "Tool finished in {}ms",
                    result.execution_time_ms
                );
                result
            }
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamKind, ParamSpec, ToolSchema};
    use crate::tool::{SimpleTool, Tool};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    struct SleepyTool {
        schema: ToolSchema,
    }

    #[async_trait]
    impl Tool for SleepyTool {
        fn schema(&self) -> &ToolSchema {
            &self.schema
        }

        async fn execute(&self, _args: Map<String, Value>) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!({}))
        }

        fn latency(&self) -> LatencyClass {
            LatencyClass::Slow
        }
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(SimpleTool::new(
                ToolSchema::new("double", "Double a number")
                    .param(ParamSpec::required("n", ParamKind::Integer, "Input")),
                |args| Ok(json!({ "value": args["n"].as_i64().unwrap_or(0) * 2 })),
            )))
            .unwrap();
        registry
            .register(Arc::new(SimpleTool::new(
                ToolSchema::new("broken", "Always fails"),
                |_| Err(anyhow!("disk on fire")),
            )))
            .unwrap();
        registry
            .register(Arc::new(SimpleTool::new(
                ToolSchema::new("panicky", "Always panics"),
                |_| panic!("boom"),
            )))
            .unwrap();
        registry
            .register(Arc::new(SimpleTool::new(
                ToolSchema::new("picky", "Reports a logical failure"),
                |_| Ok(json!({ "success": false, "message": "No suitable primers found." })),
            )))
            .unwrap();
        registry
            .register(Arc::new(SleepyTool {
                schema: ToolSchema::new("sleepy", "Never finishes in time"),
            }))
            .unwrap();

        ToolExecutor::new(
            Arc::new(registry),
            ExecutorConfig {
                fast_timeout: Duration::from_secs(1),
                slow_timeout: Duration::from_millis(50),
            },
        )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_success_with_coerced_arguments() {
        let result = executor().execute("double", &args(json!({"n": 21.0}))).await;
        assert!(result.success);
        assert_eq!(result.payload["value"], 42);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = executor().execute("nope", &Map::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("unknown function: nope"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let result = executor().execute("double", &Map::new()).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("invalid arguments for double: missing required parameter 'n'")
        );
    }

    #[tokio::test]
    async fn test_handler_error_is_captured() {
        let result = executor().execute("broken", &Map::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Error executing broken: disk on fire"));
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let result = executor().execute("panicky", &Map::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Error executing panicky: boom"));
    }

    #[tokio::test]
    async fn test_logical_failure_keeps_payload() {
        let result = executor().execute("picky", &Map::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No suitable primers found."));
        assert_eq!(result.payload["message"], "No suitable primers found.");
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let result = executor().execute("sleepy", &Map::new()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("sleepy timed out after 0.05 seconds"));
    }
}
