use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

impl ToolError {
    /// Map a transport error from a tool's HTTP client
    pub fn from_http(context: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ToolError::Timeout
        } else if e.is_connect() {
            ToolError::ExecutionFailed(format!("{}: connection failed: {}", context, e))
        } else {
            ToolError::ExecutionFailed(format!("{}: {}", context, e))
        }
    }
}
