//! Static tool registry
//!
//! Built once at startup and shared behind an `Arc`. Registration order is
//! preserved so the tool list advertised to the model is stable.

use anyhow::{bail, Result};
use std::collections::HashMap;
use tracing::debug;

use crate::schema::ToolSchema;
use crate::tool::BoxedTool;

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(&mut self, tool: BoxedTool) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            bail!("tool '{}' is already registered", name);
        }
        debug!(tool = %name, latency = %tool.latency(), "Registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<BoxedTool> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Schemas of every registered tool, in registration order
    pub fn list_tools(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema().clone()).collect()
    }

    pub fn tools(&self) -> &[BoxedTool] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
