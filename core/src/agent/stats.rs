use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Lightweight in-agent counters, safe to bump from concurrent turns
#[derive(Debug, Default)]
pub struct AgentStats {
    turns: AtomicU64,
    tool_calls: AtomicU64,
    tool_failures: AtomicU64,
    malformed_directives: AtomicU64,
    provider_failures: AtomicU64,
    calls_by_tool: DashMap<String, u64>,
}

/// Point-in-time copy of `AgentStats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStatsSnapshot {
    pub turns: u64,
    pub tool_calls: u64,
    pub tool_failures: u64,
    pub malformed_directives: u64,
    pub provider_failures: u64,
    pub calls_by_tool: BTreeMap<String, u64>,
}

impl AgentStats {
    pub(crate) fn record_turn(&self) {
        self.turns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tool_call(&self, tool: &str, succeeded: bool) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.tool_failures.fetch_add(1, Ordering::Relaxed);
        }
        *self.calls_by_tool.entry(tool.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed_directives.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AgentStatsSnapshot {
        AgentStatsSnapshot {
            turns: self.turns.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_failures: self.tool_failures.load(Ordering::Relaxed),
            malformed_directives: self.malformed_directives.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            calls_by_tool: self
                .calls_by_tool
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
        }
    }
}
