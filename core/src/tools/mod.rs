pub mod error;
pub mod invocation;
pub mod native;
pub mod registry;
pub mod schema;
pub mod traits;

// Re-export common types
pub use error::{ToolError, ToolResult};
pub use invocation::{RawResult, ToolInvocation};
pub use registry::{ToolDescription, ToolRegistry};
pub use schema::{ParamSpec, ParamType};
pub use traits::{Tool, ToolContext};
