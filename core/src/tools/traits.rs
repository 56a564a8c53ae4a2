use super::error::ToolResult;
use super::schema::{self, ParamSpec};
use crate::secrets::Secrets;
use async_trait::async_trait;
use serde_json::Value;

/// Per-turn context handed to a tool call
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub secrets: Secrets,
}

impl ToolContext {
    pub fn new(secrets: Secrets) -> Self {
        Self { secrets }
    }

    /// Look up a named key for this turn (request value, else environment default)
    pub fn key(&self, name: &str) -> Option<&str> {
        self.secrets.get(name)
    }
}

/// The core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of the tool (e.g., "weather")
    fn name(&self) -> String;

    /// A human-readable description of what the tool does
    fn description(&self) -> String;

    /// Ordered input contract
    fn input_schema(&self) -> Vec<ParamSpec>;

    /// The JSON Schema rendering of `input_schema`
    fn parameters(&self) -> Value {
        schema::to_json_schema(&self.input_schema())
    }

    /// Execute the tool with already-validated arguments
    async fn call(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<Value>;
}
