// Hand-written fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use freethinker_core::llm::{CompletionRequest, LlmProvider, ProviderKind};
use freethinker_core::tools::{ParamSpec, ParamType, Tool, ToolContext, ToolError, ToolResult};
use freethinker_core::ProviderError;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Provider that replays scripted replies in order and records every request
pub struct ScriptedProvider {
    kind: ProviderKind,
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    models: Mutex<VecDeque<Result<Vec<String>, ProviderError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub model_keys: Mutex<Vec<Option<String>>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            replies: Mutex::new(VecDeque::new()),
            models: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            model_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, err: ProviderError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn list(self, models: Result<Vec<String>, ProviderError>) -> Self {
        self.models.lock().unwrap().push_back(models);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, i: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn list_models(&self, api_key: Option<&str>) -> Result<Vec<String>, ProviderError> {
        self.model_keys
            .lock()
            .unwrap()
            .push(api_key.map(str::to_string));
        self.models
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("no scripted model list".into())))
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("no scripted reply".into())))
    }
}

/// Tool returning a fixed result and counting its calls
pub struct FakeTool {
    name: String,
    params: Vec<ParamSpec>,
    result: Result<Value, String>,
    calls: AtomicUsize,
    watched_key: Option<String>,
    pub seen_key: Mutex<Option<String>>,
    pub seen_args: Mutex<Option<Value>>,
}

impl FakeTool {
    pub fn ok(name: &str, params: Vec<ParamSpec>, payload: Value) -> Self {
        Self::build(name, params, Ok(payload))
    }

    pub fn failing(name: &str, params: Vec<ParamSpec>, reason: &str) -> Self {
        Self::build(name, params, Err(reason.to_string()))
    }

    fn build(name: &str, params: Vec<ParamSpec>, result: Result<Value, String>) -> Self {
        Self {
            name: name.to_string(),
            params,
            result,
            calls: AtomicUsize::new(0),
            watched_key: None,
            seen_key: Mutex::new(None),
            seen_args: Mutex::new(None),
        }
    }

    /// Record the value of `key` from the call context
    pub fn watching(mut self, key: &str) -> Self {
        self.watched_key = Some(key.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FakeTool {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!("fake {}", self.name)
    }

    fn input_schema(&self) -> Vec<ParamSpec> {
        self.params.clone()
    }

    async fn call(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_args.lock().unwrap() = Some(arguments);
        if let Some(k) = &self.watched_key {
            *self.seen_key.lock().unwrap() = ctx.key(k).map(str::to_string);
        }
        self.result
            .clone()
            .map_err(ToolError::ExecutionFailed)
    }
}

pub fn location_param() -> Vec<ParamSpec> {
    vec![ParamSpec::required("location", ParamType::String, "city")]
}

pub fn subreddit_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::required("subreddit", ParamType::String, "community"),
        ParamSpec::optional("limit", ParamType::Integer, "posts"),
    ]
}

pub fn calculator_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::required("num1", ParamType::Number, "a"),
        ParamSpec::required("num2", ParamType::Number, "b"),
        ParamSpec::required("operation", ParamType::String, "op"),
    ]
}

pub fn query_params() -> Vec<ParamSpec> {
    vec![ParamSpec::required("query", ParamType::String, "query")]
}
