use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::verify::VerifierPenalties;
use crate::{FreethinkerError, Result};

/// Runtime configuration for the agent, its providers and its tools
#[derive(Clone, Debug, PartialEq)]
pub struct AgentConfig {
    /// Per-request timeout for every outbound HTTP call
    pub request_timeout_ms: u64,
    pub user_agent: String,
    /// Provider used when a request does not name one
    pub default_provider: String,
    /// Model used when a request does not name one (else the provider's first listed model)
    pub default_model: Option<String>,
    pub groq_base_url: String,
    pub gemini_base_url: String,
    pub mistral_base_url: String,
    pub search_limit: usize,
    pub forum_limit: usize,
    /// Ask the provider to interpret tool results; off yields deterministic summaries
    pub interpret_results: bool,
    pub penalties: VerifierPenalties,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: std::env::var("FREETHINKER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
            user_agent: env_or("FREETHINKER_USER_AGENT", "freethinker-agent/0.1"),
            default_provider: env_or("FREETHINKER_PROVIDER", "groq"),
            default_model: std::env::var("FREETHINKER_MODEL")
                .ok()
                .filter(|s| !s.is_empty()),
            groq_base_url: env_or("GROQ_BASE_URL", "https://api.groq.com/openai/v1"),
            gemini_base_url: env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            mistral_base_url: env_or("MISTRAL_BASE_URL", "https://api.mistral.ai/v1"),
            search_limit: 5,
            forum_limit: 5,
            interpret_results: true,
            penalties: VerifierPenalties::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file (path via FREETHINKER_CONFIG or ./freethinker.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let path =
            std::env::var("FREETHINKER_CONFIG").unwrap_or_else(|_| "freethinker.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "config", path = %path, "No TOML config found; using defaults/env");
            return Self::default();
        }
        match Self::load_from(p) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "config", error = %e, "Failed to load TOML; using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let t: AgentToml =
            toml::from_str(s).map_err(|e| FreethinkerError::Config(e.to_string()))?;
        let cfg = t.overlay(Self::default());
        cfg.penalties.validate().map_err(FreethinkerError::Config)?;
        Ok(cfg)
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, Deserialize)]
struct AgentToml {
    pub request_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub interpret_results: Option<bool>,
    pub providers: Option<ProvidersToml>,
    pub tools: Option<ToolsToml>,
    pub verifier: Option<VerifierToml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProvidersToml {
    pub groq_base_url: Option<String>,
    pub gemini_base_url: Option<String>,
    pub mistral_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ToolsToml {
    pub search_limit: Option<usize>,
    pub forum_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VerifierToml {
    pub missing_fields: Option<f64>,
    pub invocation_failure: Option<f64>,
    pub conflict: Option<f64>,
    pub cross_validation_threshold: Option<f64>,
}

impl AgentToml {
    fn overlay(self, mut base: AgentConfig) -> AgentConfig {
        if let Some(v) = self.request_timeout_ms {
            base.request_timeout_ms = v;
        }
        if let Some(v) = self.user_agent {
            base.user_agent = v;
        }
        if let Some(v) = self.default_provider {
            base.default_provider = v;
        }
        if let Some(v) = self.default_model {
            base.default_model = Some(v).filter(|s| !s.is_empty());
        }
        if let Some(v) = self.interpret_results {
            base.interpret_results = v;
        }
        if let Some(p) = self.providers {
            if let Some(v) = p.groq_base_url {
                base.groq_base_url = v;
            }
            if let Some(v) = p.gemini_base_url {
                base.gemini_base_url = v;
            }
            if let Some(v) = p.mistral_base_url {
                base.mistral_base_url = v;
            }
        }
        if let Some(t) = self.tools {
            if let Some(v) = t.search_limit {
                base.search_limit = v;
            }
            if let Some(v) = t.forum_limit {
                base.forum_limit = v;
            }
        }
        if let Some(v) = self.verifier {
            v.apply(&mut base.penalties);
        }
        base
    }
}

impl VerifierToml {
    fn apply(self, p: &mut VerifierPenalties) {
        if let Some(v) = self.missing_fields {
            p.missing_fields = v;
        }
        if let Some(v) = self.invocation_failure {
            p.invocation_failure = v;
        }
        if let Some(v) = self.conflict {
            p.conflict = v;
        }
        if let Some(v) = self.cross_validation_threshold {
            p.cross_validation_threshold = v;
        }
    }
}
