use crate::config::AgentConfig;
use crate::secrets::SERPER_API_KEY;
use crate::tools::{ParamSpec, ParamType, Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the search tool's two engines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// Serper (Google) endpoint, used when a key is available
    pub serper_endpoint: String,
    /// DuckDuckGo Instant Answer endpoint, used otherwise
    pub duckduckgo_endpoint: String,
    pub default_limit: usize,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            serper_endpoint: "https://google.serper.dev/search".to_string(),
            duckduckgo_endpoint: "https://api.duckduckgo.com/".to_string(),
            default_limit: 5,
            timeout_ms: 10_000,
            user_agent: "freethinker-agent/0.1".to_string(),
        }
    }
}

/// Search result item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub domain: String,
}

impl SearchResult {
    fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: title.into(),
            domain: domain_of(&url),
            url,
            snippet: snippet.into(),
        }
    }
}

/// Host of a URL without a leading `www.`, or empty when unparsable
pub fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Serper response: only the organic block is used
#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

/// DuckDuckGo API response structure
#[derive(Debug, Deserialize)]
struct DuckDuckGoResponse {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Result {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

fn parse_serper(body: &Value, limit: usize) -> Vec<SearchResult> {
    let Ok(resp) = serde_json::from_value::<SerperResponse>(body.clone()) else {
        return Vec::new();
    };
    resp.organic
        .into_iter()
        .filter(|r| !r.link.is_empty())
        .take(limit)
        .map(|r| {
            SearchResult::new(
                r.title,
                r.link,
                r.snippet.unwrap_or_else(|| "No snippet available".to_string()),
            )
        })
        .collect()
}

fn parse_duckduckgo(body: &Value, limit: usize) -> Vec<SearchResult> {
    let Ok(resp) = serde_json::from_value::<DuckDuckGoResponse>(body.clone()) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    if !resp.abstract_text.is_empty() && !resp.abstract_url.is_empty() {
        let title = if resp.heading.is_empty() {
            "Summary".to_string()
        } else {
            resp.heading.clone()
        };
        results.push(SearchResult::new(title, resp.abstract_url, resp.abstract_text));
    }

    fn extract(topics: &[RelatedTopic], results: &mut Vec<SearchResult>, limit: usize) {
        for topic in topics {
            if results.len() >= limit {
                break;
            }
            match topic {
                RelatedTopic::Result { text, first_url } => {
                    if !text.is_empty() && !first_url.is_empty() {
                        // DuckDuckGo topic text reads "Title - snippet"
                        let title = text.split(" - ").next().unwrap_or(text);
                        results.push(SearchResult::new(title, first_url.clone(), text.clone()));
                    }
                }
                RelatedTopic::Group { topics } => extract(topics, results, limit),
            }
        }
    }
    extract(&resp.related_topics, &mut results, limit);
    results.truncate(limit);
    results
}

/// Web search: Serper when `SERPER_API_KEY` is available for the turn,
/// keyless DuckDuckGo otherwise
pub struct WebSearchTool {
    config: WebSearchConfig,
    http_client: reqwest::Client,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::with_config(WebSearchConfig::default())
    }
}

impl WebSearchTool {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self::with_config(WebSearchConfig {
            default_limit: cfg.search_limit,
            timeout_ms: cfg.request_timeout_ms,
            user_agent: cfg.user_agent.clone(),
            ..WebSearchConfig::default()
        })
    }

    pub fn with_config(config: WebSearchConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            http_client,
        }
    }

    async fn search_serper(&self, api_key: &str, query: &str, limit: usize) -> ToolResult<Vec<SearchResult>> {
        debug!(target: "web_search", query = %query, limit, "Performing Serper search");

        let resp = self
            .http_client
            .post(&self.config.serper_endpoint)
            .header("X-API-KEY", api_key)
            .json(&json!({"q": query, "num": limit}))
            .send()
            .await
            .map_err(|e| ToolError::from_http("Search request failed", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed(format!(
                "Serper API error: {} - {}",
                status, body
            )));
        }

        let body: Value = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse search response: {}", e))
        })?;
        Ok(parse_serper(&body, limit))
    }

    async fn search_duckduckgo(&self, query: &str, limit: usize) -> ToolResult<Vec<SearchResult>> {
        debug!(target: "web_search", query = %query, limit, "Performing DuckDuckGo search");

        let url = format!(
            "{}?q={}&format=json&no_html=1&skip_disambig=1",
            self.config.duckduckgo_endpoint,
            urlencoding::encode(query)
        );

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::from_http("Search request failed", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(target: "web_search", status = %status, "DuckDuckGo API returned error");
            return Err(ToolError::ExecutionFailed(format!(
                "Search API returned status: {}",
                status
            )));
        }

        let body: Value = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse search response: {}", e))
        })?;
        Ok(parse_duckduckgo(&body, limit))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> String {
        "search".to_string()
    }

    fn description(&self) -> String {
        "Search the web for current information and return titled results with source links".to_string()
    }

    fn input_schema(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("query", ParamType::String, "Search query"),
            ParamSpec::optional(
                "limit",
                ParamType::Integer,
                "Maximum number of results (default: 5, max: 20)",
            ),
        ]
    }

    async fn call(&self, arguments: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let query = arguments["query"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query'".to_string()))?;

        let limit = arguments["limit"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(self.config.default_limit)
            .clamp(1, 20);

        let (engine, results) = match ctx.key(SERPER_API_KEY) {
            Some(key) => ("serper", self.search_serper(key, query, limit).await?),
            None => ("duckduckgo", self.search_duckduckgo(query, limit).await?),
        };

        debug!(target: "web_search", engine, result_count = results.len(), "Search completed");

        Ok(json!({
            "query": query,
            "engine": engine,
            "results": results,
        }))
    }
}
