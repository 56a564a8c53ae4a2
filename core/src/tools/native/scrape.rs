use crate::config::AgentConfig;
use crate::tools::{ParamSpec, ParamType, Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const MAX_HEADINGS: usize = 5;
const MAX_PARAGRAPHS: usize = 8;
const MIN_PARAGRAPH_CHARS: usize = 30;

/// `example.com` → `https://example.com`; explicit schemes are kept
pub fn with_scheme(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn selector(css: &str) -> ToolResult<Selector> {
    Selector::parse(css).map_err(|e| ToolError::Internal(format!("Bad selector '{}': {}", css, e)))
}

fn collapse<'a>(text: impl Iterator<Item = &'a str>) -> String {
    let joined: String = text.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta_content(doc: &Html, name: &str) -> ToolResult<String> {
    let sel = selector(&format!(
        "meta[name=\"{0}\"], meta[property=\"og:{0}\"]",
        name
    ))?;
    Ok(doc
        .select(&sel)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .unwrap_or_default()
        .to_string())
}

/// Pull title, meta fields, headings and substantial paragraphs out of a page
pub fn extract_page(html: &str, url: &str) -> ToolResult<Value> {
    let doc = Html::parse_document(html);

    let title_sel = selector("title")?;
    let title = doc
        .select(&title_sel)
        .next()
        .map(|t| collapse(t.text()))
        .unwrap_or_default();

    let heading_sel = selector("h1, h2, h3")?;
    let headings: Vec<String> = doc
        .select(&heading_sel)
        .map(|h| collapse(h.text()))
        .filter(|h| h.chars().count() > 5)
        .take(MAX_HEADINGS)
        .collect();

    let para_sel = selector("p")?;
    let content: Vec<String> = doc
        .select(&para_sel)
        .map(|p| collapse(p.text()))
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .take(MAX_PARAGRAPHS)
        .collect();

    let keywords: Vec<String> = meta_content(&doc, "keywords")?
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();

    Ok(json!({
        "url": url,
        "title": title,
        "description": meta_content(&doc, "description")?,
        "keywords": keywords,
        "headings": headings,
        "content": content.join("\n\n"),
    }))
}

/// Fetch a page and summarize its readable parts
pub struct ScrapeTool {
    http_client: reqwest::Client,
}

impl Default for ScrapeTool {
    fn default() -> Self {
        Self::with_timeout(10_000, "freethinker-agent/0.1")
    }
}

impl ScrapeTool {
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self::with_timeout(cfg.request_timeout_ms, &cfg.user_agent)
    }

    pub fn with_timeout(timeout_ms: u64, user_agent: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http_client }
    }
}

#[async_trait]
impl Tool for ScrapeTool {
    fn name(&self) -> String {
        "scrape".to_string()
    }

    fn description(&self) -> String {
        "Fetch a web page and extract its title, description, headings and main text".to_string()
    }

    fn input_schema(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "url",
            ParamType::String,
            "Page address; https:// is assumed when no scheme is given",
        )]
    }

    async fn call(&self, arguments: Value, _ctx: &ToolContext) -> ToolResult<Value> {
        let raw = arguments["url"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url'".to_string()))?;
        let url = with_scheme(raw);
        reqwest::Url::parse(&url)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid url '{}': {}", raw, e)))?;

        debug!(target: "scrape_tool", url = %url, "Fetching page");

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::from_http("Page request failed", e))?;

        if !resp.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "Page returned status {}",
                resp.status()
            )));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| ToolError::from_http("Failed to read page body", e))?;

        extract_page(&html, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title> The  Rust
            Book </title>
        <meta name="description" content="Learn Rust.">
        <meta name="keywords" content="rust, book , ,programming">
        </head><body>
        <h1>Getting Started</h1>
        <h2>Hi</h2>
        <p>Short.</p>
        <p>Rust is a language empowering everyone to build reliable software.</p>
        </body></html>"#;

    #[test]
    fn extracts_page_parts() {
        let v = extract_page(PAGE, "https://doc.rust-lang.org/book").unwrap();
        assert_eq!(v["title"], "The Rust Book");
        assert_eq!(v["description"], "Learn Rust.");
        assert_eq!(v["keywords"], json!(["rust", "book", "programming"]));
        assert_eq!(v["headings"], json!(["Getting Started"]));
        assert_eq!(
            v["content"],
            "Rust is a language empowering everyone to build reliable software."
        );
    }

    #[test]
    fn empty_page_yields_empty_content() {
        let v = extract_page("<html></html>", "https://x.test").unwrap();
        assert_eq!(v["content"], "");
        assert_eq!(v["headings"], json!([]));
    }

    #[test]
    fn scheme_is_defaulted() {
        assert_eq!(with_scheme("example.com/a"), "https://example.com/a");
        assert_eq!(with_scheme("http://example.com"), "http://example.com");
    }
}
