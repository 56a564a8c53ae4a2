use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;
use crate::secrets;
use crate::FreethinkerError;

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    Gemini,
    Mistral,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Groq, ProviderKind::Gemini, ProviderKind::Mistral];

    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Mistral => "mistral",
        }
    }

    /// Name of the secret holding this provider's API key
    pub fn key_name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => secrets::GROQ_API_KEY,
            ProviderKind::Gemini => secrets::GOOGLE_API_KEY,
            ProviderKind::Mistral => secrets::MISTRAL_API_KEY,
        }
    }

    /// Models offered before any explicit refresh
    pub fn default_models(&self) -> Vec<String> {
        let models: &[&str] = match self {
            ProviderKind::Groq => &["llama-3.1-70b-versatile", "llama-3.1-8b-instant"],
            ProviderKind::Gemini => &["gemini-1.5-pro", "gemini-1.5-flash"],
            ProviderKind::Mistral => &[
                "open-mistral-7b",
                "open-mixtral-8x7b",
                "mistral-large-latest",
                "codestral-latest",
            ],
        };
        models.iter().map(|m| m.to_string()).collect()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = FreethinkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "mistral" => Ok(ProviderKind::Mistral),
            other => Err(FreethinkerError::UnknownProvider(other.to_string())),
        }
    }
}

/// One stateless completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            model: model.into(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    pub fn with_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The key, or an auth error naming the missing secret
    pub(crate) fn require_key(&self, kind: ProviderKind) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::Auth(format!("{} not provided", kind.key_name())))
    }
}

/// The interface every LLM backend implements. Callers never branch on the
/// concrete backend; adding one means adding a `ProviderKind` variant and an impl.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fetch the backend's current model ids. A pure query: no cached state is touched.
    async fn list_models(&self, api_key: Option<&str>) -> Result<Vec<String>, ProviderError>;

    /// Single-shot completion with no conversation history
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Groq".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert_eq!(" GEMINI ".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!(matches!(
            "openai".parse::<ProviderKind>(),
            Err(FreethinkerError::UnknownProvider(_))
        ));
    }

    #[test]
    fn missing_key_is_auth_error() {
        let req = CompletionRequest::new("s", "u", "m").with_key(Some("  ".into()));
        assert!(matches!(
            req.require_key(ProviderKind::Mistral),
            Err(ProviderError::Auth(m)) if m.contains("MISTRAL_API_KEY")
        ));
    }
}
