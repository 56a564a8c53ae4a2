use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::error::ProviderError;
use super::provider::{CompletionRequest, LlmProvider, ProviderKind};

/// Chat Completions backend (Groq and Mistral both speak this dialect)
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    kind: ProviderKind,
    base_url: String,
    http: Client,
}

impl OpenAiCompatProvider {
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, timeout_ms: u64, user_agent: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            kind,
            base_url: base_url.into(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn list_models(&self, api_key: Option<&str>) -> Result<Vec<String>, ProviderError> {
        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::Auth(format!("{} not provided", self.kind.key_name())))?;

        let url = self.url("models");
        debug!(target: "llm_client", provider = %self.kind, "GET {}", url);

        let resp = self.http.get(&url).bearer_auth(key).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }
        let val: Value = resp.json().await?;
        Ok(parse_model_ids(&val))
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let key = request.require_key(self.kind)?;

        let mut messages = Vec::new();
        if !request.system_prompt.is_empty() {
            messages.push(json!({"role": "system", "content": request.system_prompt}));
        }
        messages.push(json!({"role": "user", "content": request.user_prompt}));

        let body = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let url = self.url("chat/completions");
        debug!(target: "llm_client", provider = %self.kind, model = %request.model, "POST {} via Chat Completions", url);

        let resp = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target: "llm_client", provider = %self.kind, %status, "Chat Completions error");
            return Err(ProviderError::from_status(status, text));
        }

        let val: Value = resp.json().await?;
        parse_chat_text(&val).ok_or_else(|| {
            ProviderError::InvalidResponse("Missing choices[0].message.content".into())
        })
    }
}

/// `{"data": [{"id": ...}, ...]}` → ids, in listing order
pub fn parse_model_ids(v: &Value) -> Vec<String> {
    v.get("data")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_chat_text(v: &Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}
