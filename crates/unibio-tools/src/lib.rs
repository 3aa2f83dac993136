//! unibio-tools: Tool Registry and Execution
//!
//! Provides the declarative tool schemas, the static registry, the built-in
//! molecular-biology tools, the executor that normalizes every call into a
//! `ToolResult`, and the HTTP router that exposes the same tools over REST.

pub mod builtin;
pub mod entrez;
pub mod executor;
pub mod registry;
pub mod router;
pub mod schema;
pub mod tool;

// Re-export main types
pub use entrez::EntrezClient;
pub use executor::{ExecutorConfig, ToolExecutor};
pub use registry::ToolRegistry;
pub use router::{create_router, ToolsServiceRouter, ToolsState};
pub use schema::{ArgumentError, ParamKind, ParamSpec, ToolSchema};
pub use tool::{BoxedTool, SimpleTool, Tool};

use std::sync::Arc;

/// Build a registry holding every built-in tool.
pub fn builtin_registry(entrez: Arc<EntrezClient>) -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    builtin::register_builtin_tools(&mut registry, entrez)?;
    Ok(registry)
}
