use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::error::ProviderError;
use super::gemini::GeminiProvider;
use super::openai_compat::OpenAiCompatProvider;
use super::provider::{CompletionRequest, LlmProvider, ProviderKind};
use crate::config::AgentConfig;
use crate::{FreethinkerError, Result};

/// A provider plus the model list it offers this session.
///
/// The list starts from static defaults and changes only through
/// `refresh_models`, which always re-fetches.
pub struct ProviderAdapter {
    provider: Arc<dyn LlmProvider>,
    models: RwLock<Vec<String>>,
}

impl ProviderAdapter {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let models = provider.kind().default_models();
        Self {
            provider,
            models: RwLock::new(models),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Current model list (defaults until the first successful refresh)
    pub async fn models(&self) -> Vec<String> {
        self.models.read().await.clone()
    }

    /// First listed model, used when a request names none
    pub async fn default_model(&self) -> Option<String> {
        self.models.read().await.first().cloned()
    }

    /// Re-fetch the model list and replace the cached one. On failure the
    /// previous list stays in place and the error is returned.
    pub async fn refresh_models(&self, api_key: Option<&str>) -> std::result::Result<Vec<String>, ProviderError> {
        match self.provider.list_models(api_key).await {
            Ok(fetched) => {
                let fresh = if fetched.is_empty() {
                    self.kind().default_models()
                } else {
                    fetched
                };
                info!(target: "llm_client", provider = %self.kind(), count = fresh.len(), "Model list refreshed");
                *self.models.write().await = fresh.clone();
                Ok(fresh)
            }
            Err(e) => {
                warn!(target: "llm_client", provider = %self.kind(), error = %e, "Model refresh failed; keeping previous list");
                Err(e)
            }
        }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, ProviderError> {
        self.provider.complete(request).await
    }
}

/// One adapter per provider kind, shared by every turn
#[derive(Clone, Default)]
pub struct ProviderHub {
    adapters: HashMap<ProviderKind, Arc<ProviderAdapter>>,
}

impl ProviderHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// All three HTTP-backed providers, configured from `cfg`
    pub fn from_config(cfg: &AgentConfig) -> Self {
        let mut hub = Self::new();
        hub.insert(Arc::new(OpenAiCompatProvider::new(
            ProviderKind::Groq,
            cfg.groq_base_url.clone(),
            cfg.request_timeout_ms,
            &cfg.user_agent,
        )));
        hub.insert(Arc::new(GeminiProvider::new(
            cfg.gemini_base_url.clone(),
            cfg.request_timeout_ms,
            &cfg.user_agent,
        )));
        hub.insert(Arc::new(OpenAiCompatProvider::new(
            ProviderKind::Mistral,
            cfg.mistral_base_url.clone(),
            cfg.request_timeout_ms,
            &cfg.user_agent,
        )));
        hub
    }

    /// Add or replace the adapter for a provider's kind
    pub fn insert(&mut self, provider: Arc<dyn LlmProvider>) {
        let adapter = ProviderAdapter::new(provider);
        self.adapters.insert(adapter.kind(), Arc::new(adapter));
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<ProviderAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    /// Look up by id ("groq", "gemini", "mistral")
    pub fn resolve(&self, id: &str) -> Result<Arc<ProviderAdapter>> {
        let kind: ProviderKind = id.parse()?;
        self.get(kind)
            .ok_or_else(|| FreethinkerError::UnknownProvider(id.to_string()))
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .iter()
            .copied()
            .filter(|k| self.adapters.contains_key(k))
            .collect()
    }
}
