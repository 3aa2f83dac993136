//! Core Tool trait and types
//!
//! Defines the fundamental interface for all tools in the system.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::schema::ToolSchema;
use unibio_core::LatencyClass;

/// Core trait for all tools
///
/// `execute` receives arguments that already passed `ToolSchema::decode`,
/// so required fields are present and typed. Handlers return `Err` on
/// failure rather than a malformed payload.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declarative schema (name, description, parameters)
    fn schema(&self) -> &ToolSchema;

    /// Execute the tool with decoded arguments
    async fn execute(&self, args: Map<String, Value>) -> Result<Value>;

    fn name(&self) -> &str {
        &self.schema().name
    }

    fn description(&self) -> &str {
        &self.schema().description
    }

    /// Latency class, used to pick the execution timeout
    fn latency(&self) -> LatencyClass {
        LatencyClass::Fast
    }

    /// Get the category this tool belongs to
    fn category(&self) -> &str {
        "general"
    }
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

type Handler = Arc<dyn Fn(Map<String, Value>) -> Result<Value> + Send + Sync>;

/// Closure-backed tool, handy for tests and small adapters
#[derive(Clone)]
pub struct SimpleTool {
    schema: ToolSchema,
    latency: LatencyClass,
    handler: Handler,
}

impl SimpleTool {
    pub fn new<F>(schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            schema,
            latency: LatencyClass::Fast,
            handler: Arc::new(handler),
        }
    }

    pub fn with_latency(mut self, latency: LatencyClass) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Tool for SimpleTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value> {
        (self.handler)(args)
    }

    fn latency(&self) -> LatencyClass {
        self.latency
    }
}
