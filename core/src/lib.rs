// FreeThinker Core Library
// Tool-selecting LLM agent: orchestration, provider adapters, verification

pub mod agent;
pub mod config;
pub mod llm;
pub mod normalize;
pub mod secrets;
pub mod telemetry;
pub mod tools;
pub mod verify;

// Export core types
pub use agent::{Agent, AgentRequest, AgentStats, AgentStatsSnapshot, TurnReport, TurnState};
pub use config::AgentConfig;
pub use llm::{ProviderAdapter, ProviderError, ProviderHub, ProviderKind};
pub use normalize::{DisplayData, ResponseNormalizer, StructuredResponse, VisualHint, Widget};
pub use secrets::Secrets;
pub use tools::native::default_registry;
pub use tools::{RawResult, Tool, ToolContext, ToolError, ToolInvocation, ToolRegistry};
pub use verify::{VerificationResult, Verifier, VerifierPenalties};

// Error types
use thiserror::Error;

/// Structural errors. These abort a turn and reach the caller verbatim.
/// Tool and provider faults inside a turn never surface here; `Provider` is
/// only returned by an explicit model refresh.
#[derive(Error, Debug)]
pub enum FreethinkerError {
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Malformed directive: {0}")]
    MalformedDirective(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider error: {0}")]
    Provider(#[from] llm::ProviderError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, FreethinkerError>;
