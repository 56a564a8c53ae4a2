use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::StructuredResponse;
use crate::tools::ToolInvocation;
use crate::Result;

/// One user turn's input. Created per turn and consumed by it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRequest {
    pub prompt: String,
    /// "groq", "gemini" or "mistral"; the configured default when absent
    pub provider_id: Option<String>,
    /// Any model id, listed or not; the provider's first model when absent
    pub model_id: Option<String>,
    /// Named secrets for this turn. These override environment values.
    #[serde(default)]
    pub keys: HashMap<String, String>,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(name.into(), value.into());
        self
    }
}

/// Orchestrator states. A turn runs `Idle → Selecting → Invoking → Verifying →
/// Responding → Idle`; `Failed` ends a turn from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnState {
    Idle,
    Selecting,
    Invoking,
    Verifying,
    Responding,
    Failed,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnState::Idle => "idle",
            TurnState::Selecting => "selecting",
            TurnState::Invoking => "invoking",
            TurnState::Verifying => "verifying",
            TurnState::Responding => "responding",
            TurnState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything a turn produced: the visited states, the single tool call (if
/// any) and the outcome handed to the caller
#[derive(Debug)]
pub struct TurnReport {
    pub states: Vec<TurnState>,
    pub invocation: Option<ToolInvocation>,
    pub outcome: Result<StructuredResponse>,
}

impl TurnReport {
    pub fn final_state(&self) -> TurnState {
        self.states.last().copied().unwrap_or(TurnState::Idle)
    }

    pub fn visited(&self, state: TurnState) -> bool {
        self.states.contains(&state)
    }
}

/// State trace of a turn in progress
#[derive(Debug)]
pub(crate) struct Trace {
    states: Vec<TurnState>,
}

impl Trace {
    pub(crate) fn start() -> Self {
        Self {
            states: vec![TurnState::Idle],
        }
    }

    pub(crate) fn enter(&mut self, next: TurnState) {
        let from = self.states.last().copied().unwrap_or(TurnState::Idle);
        debug!(target: "agent", %from, to = %next, "Turn state transition");
        self.states.push(next);
    }

    pub(crate) fn finish(
        mut self,
        invocation: Option<ToolInvocation>,
        outcome: Result<StructuredResponse>,
    ) -> TurnReport {
        self.enter(if outcome.is_ok() {
            TurnState::Idle
        } else {
            TurnState::Failed
        });
        TurnReport {
            states: self.states,
            invocation,
            outcome,
        }
    }
}
