//! Web search tool backed by the Tavily search API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::WebSearchConfig;
use crate::error::{AgentLineError, Result};

use super::{Tool, ToolContext};

const TAVILY_API_URL: &str = "https://api.tavily.com/search";
const SEARCH_TIMEOUT_SECS: u64 = 30;
const NO_RESULTS: &str = "検索結果が見つかりませんでした。";

/// `web_search`: general web search returning a summary and result snippets.
pub struct WebSearchTool {
    api_key: String,
    api_url: String,
    client: Client,
    max_results: u32,
    search_depth: String,
    include_answer: bool,
}

impl WebSearchTool {
    /// Build the tool from config. Returns `None` when no API key is configured.
    pub fn from_config(config: &WebSearchConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Some(Self {
            api_key: api_key.to_string(),
            api_url: TAVILY_API_URL.to_string(),
            client,
            max_results: config.max_results,
            search_depth: config.search_depth.clone(),
            include_answer: config.include_answer,
        })
    }

    /// Point the tool at a different endpoint (tests, proxies).
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Render a Tavily response as plain text for the model.
fn format_results(response: &TavilyResponse) -> String {
    let mut parts = Vec::with_capacity(response.results.len() + 1);

    if let Some(answer) = response.answer.as_deref().filter(|a| !a.is_empty()) {
        parts.push(format!("【要約】\n{}", answer));
    }
    for item in &response.results {
        parts.push(format!("■ {}\n{}\n{}", item.title, item.url, item.content));
    }

    if parts.is_empty() {
        NO_RESULTS.to_string()
    } else {
        parts.join("\n\n")
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "一般的なウェブ検索を行います。ニュース、技術情報、一般知識の検索に使います。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "検索クエリ（日本語または英語）"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AgentLineError::Tool("Missing 'query' parameter".to_string()))?;

        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: &self.search_depth,
            include_answer: self.include_answer,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentLineError::Tool(format!("Web search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            let detail = detail.trim();
            return Err(AgentLineError::Tool(if detail.is_empty() {
                format!("Tavily API error: {}", status)
            } else {
                format!("Tavily API error: {} ({})", status, detail)
            }));
        }

        let payload: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AgentLineError::Tool(format!("Failed to parse search response: {}", e)))?;

        Ok(format_results(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};

    fn config_with_key() -> WebSearchConfig {
        WebSearchConfig {
            api_key: Some("tvly-test".to_string()),
            ..WebSearchConfig::default()
        }
    }

    #[test]
    fn test_from_config_requires_key() {
        assert!(WebSearchTool::from_config(&WebSearchConfig::default()).is_none());
        let blank = WebSearchConfig {
            api_key: Some("  ".to_string()),
            ..WebSearchConfig::default()
        };
        assert!(WebSearchTool::from_config(&blank).is_none());
        assert!(WebSearchTool::from_config(&config_with_key()).is_some());
    }

    #[test]
    fn test_format_with_answer_and_results() {
        let response = TavilyResponse {
            answer: Some("東京は晴れです。".to_string()),
            results: vec![
                TavilyResult {
                    title: "天気予報".to_string(),
                    url: "https://example.com/a".to_string(),
                    content: "晴れ時々曇り".to_string(),
                },
                TavilyResult {
                    title: "週間天気".to_string(),
                    url: "https://example.com/b".to_string(),
                    content: "週末は雨".to_string(),
                },
            ],
        };
        assert_eq!(
            format_results(&response),
            "【要約】\n東京は晴れです。\n\n■ 天気予報\nhttps://example.com/a\n晴れ時々曇り\n\n■ 週間天気\nhttps://example.com/b\n週末は雨"
        );
    }

    #[test]
    fn test_format_without_answer() {
        let response = TavilyResponse {
            answer: Some(String::new()),
            results: vec![TavilyResult {
                title: "t".to_string(),
                url: "u".to_string(),
                content: "c".to_string(),
            }],
        };
        assert_eq!(format_results(&response), "■ t\nu\nc");
    }

    #[test]
    fn test_format_no_results() {
        assert_eq!(format_results(&TavilyResponse::default()), NO_RESULTS);
    }

    #[tokio::test]
    async fn test_missing_query_rejected() {
        let tool = WebSearchTool::from_config(&config_with_key()).unwrap();
        let err = tool
            .execute(json!({"query": "  "}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn test_execute_against_fake_tavily() {
        async fn search(Json(body): Json<Value>) -> Json<Value> {
            assert_eq!(body["max_results"], 5);
            assert_eq!(body["search_depth"], "basic");
            assert_eq!(body["include_answer"], true);
            Json(json!({
                "answer": format!("answer for {}", body["query"].as_str().unwrap_or_default()),
                "results": [{"title": "T", "url": "https://x", "content": "C", "score": 0.9}]
            }))
        }

        let app = Router::new().route("/search", post(search));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let tool = WebSearchTool::from_config(&config_with_key())
            .unwrap()
            .with_api_url(&format!("http://{}/search", addr));
        let out = tool
            .execute(json!({"query": "rust"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, "【要約】\nanswer for rust\n\n■ T\nhttps://x\nC");
    }
}
