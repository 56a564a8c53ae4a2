pub mod calculator;
pub mod forum;
pub mod scrape;
pub mod weather;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use forum::ForumTool;
pub use scrape::ScrapeTool;
pub use weather::WeatherTool;
pub use web_search::WebSearchTool;

use crate::config::AgentConfig;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// The five built-in tools, configured from `cfg`, in prompt order
pub fn default_registry(cfg: &AgentConfig) -> crate::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculatorTool::new()))?;
    registry.register(Arc::new(WeatherTool::from_config(cfg)))?;
    registry.register(Arc::new(ForumTool::from_config(cfg)))?;
    registry.register(Arc::new(WebSearchTool::from_config(cfg)))?;
    registry.register(Arc::new(ScrapeTool::from_config(cfg)))?;
    Ok(registry)
}
