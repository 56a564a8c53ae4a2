use crate::config::AgentConfig;
use crate::tools::{ParamSpec, ParamType, Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const TIME_FILTERS: [&str; 6] = ["hour", "day", "week", "month", "year", "all"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumConfig {
    /// Base of the public listing API
    pub api_endpoint: String,
    pub default_limit: usize,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://www.reddit.com".to_string(),
            default_limit: 5,
            timeout_ms: 10_000,
            user_agent: "freethinker-agent/0.1".to_string(),
        }
    }
}

/// One post of a listing, trimmed to what the agent shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumPost {
    pub title: String,
    pub score: i64,
    pub body: String,
    pub url: String,
    pub author: String,
    pub num_comments: i64,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RawPost,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    #[serde(default)]
    title: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    num_comments: i64,
}

/// `r/rust`, `/r/rust/` and `rust` all name the same community
pub fn normalize_subreddit(name: &str) -> String {
    let trimmed = name.trim().trim_matches('/');
    let stripped = trimmed
        .strip_prefix("r/")
        .or_else(|| trimmed.strip_prefix("R/"))
        .unwrap_or(trimmed);
    stripped.trim_matches('/').to_string()
}

fn parse_listing(body: &Value, base: &str) -> ToolResult<Vec<ForumPost>> {
    let listing: Listing = serde_json::from_value(body.clone()).map_err(|e| {
        ToolError::ExecutionFailed(format!("Failed to parse listing: {}", e))
    })?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|c| {
            let p = c.data;
            let url = if p.permalink.is_empty() {
                p.url
            } else {
                format!("{}{}", base.trim_end_matches('/'), p.permalink)
            };
            ForumPost {
                title: p.title,
                score: p.score,
                body: p.selftext,
                url,
                author: p.author,
                num_comments: p.num_comments,
            }
        })
        .collect())
}

/// Top posts of a subreddit from the public JSON listing
pub struct ForumTool {
    config: ForumConfig,
    http_client: reqwest::Client,
}

impl Default for ForumTool {
    fn default() -> Self {
        Self::with_config(ForumConfig::default())
    }
}

impl ForumTool {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self::with_config(ForumConfig {
            default_limit: cfg.forum_limit,
            timeout_ms: cfg.request_timeout_ms,
            user_agent: cfg.user_agent.clone(),
            ..ForumConfig::default()
        })
    }

    pub fn with_config(config: ForumConfig) -> Self {
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
}

#[async_trait]
impl Tool for ForumTool {
    fn name(&self) -> String {
        "forum".to_string()
    }

    fn description(&self) -> String {
        "Fetch the top posts of a Reddit community (title, score, body, link, comment count)".to_string()
    }

    fn input_schema(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("subreddit", ParamType::String, "Community name, e.g. 'rust' or 'r/rust'"),
            ParamSpec::optional("limit", ParamType::Integer, "Number of posts (default: 5, max: 25)"),
            ParamSpec::optional(
                "time_filter",
                ParamType::String,
                "One of hour, day, week, month, year, all (default: day)",
            ),
        ]
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<Value> {
        let subreddit = arguments["subreddit"]
            .as_str()
            .map(normalize_subreddit)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'subreddit'".to_string()))?;

        let limit = arguments["limit"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(self.config.default_limit)
            .clamp(1, 25);

        let time_filter = arguments["time_filter"]
            .as_str()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| "day".to_string());
        if !TIME_FILTERS.contains(&time_filter.as_str()) {
            return Err(ToolError::InvalidArguments(format!(
                "Unsupported time_filter '{}'",
                time_filter
            )));
        }

        let url = format!(
            "{}/r/{}/top.json?limit={}&t={}",
            self.config.api_endpoint.trim_end_matches('/'),
            urlencoding::encode(&subreddit),
            limit,
            time_filter
        );
        debug!(target: "forum_tool", subreddit = %subreddit, limit, "Fetching listing");

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::from_http("Listing request failed", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ToolError::NotFound(format!(
                "Subreddit not available: r/{}",
                subreddit
            )));
        }
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "Listing API error: {}",
                status
            )));
        }

        let body: Value = resp.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to parse listing: {}", e))
        })?;
        let mut posts = parse_listing(&body, &self.config.api_endpoint)?;
        posts.truncate(limit);

        Ok(json!({
            "subreddit": subreddit,
            "posts": posts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subreddit_prefixes_are_stripped() {
        assert_eq!(normalize_subreddit("r/rust"), "rust");
        assert_eq!(normalize_subreddit("/r/rust/"), "rust");
        assert_eq!(normalize_subreddit(" programming "), "programming");
    }

    #[test]
    fn listing_children_become_posts() {
        let body = json!({"kind": "Listing", "data": {"children": [
            {"kind": "t3", "data": {
                "title": "Rust 2.0 announced",
                "score": 1234,
                "selftext": "",
                "permalink": "/r/rust/comments/abc/rust_20/",
                "url": "https://blog.rust-lang.org",
                "author": "ferris",
                "num_comments": 321
            }},
            {"kind": "t3", "data": {"title": "Weekly thread", "url": "https://example.org/x"}}
        ]}});
        let posts = parse_listing(&body, "https://www.reddit.com").unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].url, "https://www.reddit.com/r/rust/comments/abc/rust_20/");
        assert_eq!(posts[0].score, 1234);
        assert_eq!(posts[1].url, "https://example.org/x");
        assert_eq!(posts[1].num_comments, 0);
    }

    #[test]
    fn malformed_listing_is_failure() {
        assert!(parse_listing(&json!({"error": 404}), "https://www.reddit.com").is_err());
    }

    #[tokio::test]
    async fn bad_time_filter_rejected_before_network() {
        let tool = ForumTool::with_config(ForumConfig {
            api_endpoint: "http://127.0.0.1:9".into(),
            ..ForumConfig::default()
        });
        let err = tool
            .call(json!({"subreddit": "rust", "time_filter": "decade"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
