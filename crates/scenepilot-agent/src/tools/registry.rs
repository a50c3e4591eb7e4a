//! Tool Registry — the immutable set of tools a run may call.
//!
//! Built once at startup from the reduced API description, wrapped in an
//! `Arc` and handed to every [`AgentLoop`](crate::agent_loop::AgentLoop).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use scenepilot_core::apispec::ReducedSpec;

use super::base::{Tool, ToolError};
use super::executor::RequestExecutor;
use super::requests::{reduced_tools, ReducedTool, RequestsTool};

/// Name + description of one tool, as exposed by `GET /tools`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    endpoints: Vec<ReducedTool>,
    base_url: String,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            endpoints: Vec::new(),
            base_url: String::new(),
        }
    }

    /// Derive the request tools from a reduced description: one tool per
    /// verb class that has at least one endpoint.
    pub fn from_spec(
        spec: &ReducedSpec,
        executor: Arc<dyn RequestExecutor>,
        max_response_length: usize,
    ) -> Self {
        let endpoints = reduced_tools(spec);
        let mut registry = Self {
            tools: HashMap::new(),
            endpoints: endpoints.clone(),
            base_url: spec.base_url.clone(),
        };

        for method in spec.methods_present() {
            let scoped: Vec<ReducedTool> = endpoints
                .iter()
                .filter(|e| e.http_method == method)
                .cloned()
                .collect();
            registry.register(Arc::new(RequestsTool::new(
                method,
                &spec.base_url,
                scoped,
                executor.clone(),
                max_response_length,
            )));
        }

        info!(
            base_url = %registry.base_url,
            endpoints = registry.endpoints.len(),
            tools = registry.len(),
            "tool registry built"
        );
        registry
    }

    /// Register a tool. Overwrites any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!(tool = tool.name(), "registered tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tools in name order.
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tool_names()
            .iter()
            .filter_map(|n| self.tools.get(n).cloned())
            .collect()
    }

    /// Name + description of every tool, in name order.
    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.tools()
            .iter()
            .map(|t| ToolSummary {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Every endpoint of the description the registry was built from.
    pub fn endpoints(&self) -> &[ReducedTool] {
        &self.endpoints
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invoke a tool by name with the raw argument text.
    pub async fn invoke(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| {
            warn!(tool = name, "tool not found");
            ToolError::UnknownTool(name.to_string())
        })?;

        match tool.call(input).await {
            Ok(output) => {
                debug!(tool = name, output_len = output.len(), "tool succeeded");
                Ok(output)
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                Err(e)
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
