use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::error::ProviderError;
use super::provider::{CompletionRequest, LlmProvider, ProviderKind};

// Header auth keeps the key out of request URLs and transport errors
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` backend
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    http: Client,
}

impl GeminiProvider {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64, user_agent: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn list_models(&self, api_key: Option<&str>) -> Result<Vec<String>, ProviderError> {
        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::Auth(format!("{} not provided", ProviderKind::Gemini.key_name())))?;

        let url = format!("{}/models", self.base());
        debug!(target: "llm_client", provider = "gemini", "GET {}", url);

        let resp = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, key)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }
        let val: Value = resp.json().await?;
        Ok(parse_gemini_models(&val))
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let key = request.require_key(ProviderKind::Gemini)?;
        let model = request.model.trim_start_matches("models/");

        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": request.user_prompt}]}],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
        });
        if !request.system_prompt.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": request.system_prompt}]});
        }

        let url = format!("{}/models/{}:generateContent", self.base(), model);
        debug!(target: "llm_client", provider = "gemini", model = %model, "POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target: "llm_client", provider = "gemini", %status, "generateContent error");
            return Err(ProviderError::from_status(status, text));
        }

        let val: Value = resp.json().await?;
        parse_gemini_text(&val)
            .ok_or_else(|| ProviderError::InvalidResponse("No text in candidates[0].content.parts".into()))
    }
}

/// Text-generation models only, with the `models/` prefix removed
pub fn parse_gemini_models(v: &Value) -> Vec<String> {
    v.get("models")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter(|m| {
                    m.get("supportedGenerationMethods")
                        .and_then(Value::as_array)
                        .map(|methods| {
                            methods.iter().any(|x| x.as_str() == Some("generateContent"))
                        })
                        .unwrap_or(false)
                })
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .map(|n| n.trim_start_matches("models/").to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Concatenate the text parts of the first candidate
pub fn parse_gemini_text(v: &Value) -> Option<String> {
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text.trim().to_string())
    }
}
