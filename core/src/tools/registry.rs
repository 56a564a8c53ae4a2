use super::invocation::{RawResult, ToolInvocation};
use super::schema::ParamSpec;
use super::traits::{Tool, ToolContext};
use crate::{FreethinkerError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the registry tells the model about one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub input_schema: Vec<ParamSpec>,
}

/// A registry of available tools, kept in registration order.
///
/// Built once at startup and then shared behind an `Arc`; lookups take `&self`
/// so concurrent turns can read it freely.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool. Names are unique.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name();
        if self.index.contains_key(&name) {
            warn!(target: "tool_registry", tool = %name, "Duplicate tool registration rejected");
            return Err(FreethinkerError::DuplicateTool(name));
        }
        info!(target: "tool_registry", tool = %name, "Registering tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| FreethinkerError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Capability descriptions for prompt construction, in registration order
    pub fn describe_all(&self) -> Vec<ToolDescription> {
        self.tools
            .iter()
            .map(|t| ToolDescription {
                name: t.name(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Call a tool with already-validated arguments. Tool errors are captured
    /// in the returned invocation instead of propagating.
    #[tracing::instrument(skip(self, arguments, ctx), fields(tool.name = %name))]
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        ctx: &ToolContext,
    ) -> Result<ToolInvocation> {
        let start_time = Instant::now();
        let tool = self.get(name)?;

        debug!(target: "tool_registry", tool = %name, "Invoking tool");

        let raw_result = match tool.call(arguments.clone(), ctx).await {
            Ok(payload) => RawResult::success(payload),
            Err(e) => {
                warn!(target: "tool_registry", tool = %name, error = %e, "Tool execution failed");
                RawResult::failure(e.to_string())
            }
        };

        let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        debug!(target: "tool_registry", tool = %name, latency_ms = %elapsed_ms, ok = raw_result.is_success(), "Tool invocation finished");

        Ok(ToolInvocation::new(name, arguments, raw_result))
    }
}
