use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single tool call. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RawResult {
    Success {
        payload: Value,
    },
    Failure {
        reason: String,
        /// Whatever the tool managed to produce before failing, if anything
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partial: Option<Value>,
    },
}

impl RawResult {
    pub fn success(payload: Value) -> Self {
        RawResult::Success { payload }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        RawResult::Failure {
            reason: reason.into(),
            partial: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RawResult::Success { .. })
    }

    /// The payload to inspect: the full payload on success, the partial one on failure
    pub fn payload(&self) -> Option<&Value> {
        match self {
            RawResult::Success { payload } => Some(payload),
            RawResult::Failure { partial, .. } => partial.as_ref(),
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            RawResult::Success { .. } => None,
            RawResult::Failure { reason, .. } => Some(reason),
        }
    }
}

/// One tool call made during a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub resolved_args: Value,
    pub raw_result: RawResult,
    pub timestamp: DateTime<Utc>,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, resolved_args: Value, raw_result: RawResult) -> Self {
        Self {
            tool_name: tool_name.into(),
            resolved_args,
            raw_result,
            timestamp: Utc::now(),
        }
    }
}
