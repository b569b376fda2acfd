//! Firecrawl search-and-scrape adapter

use async_trait::async_trait;
use autoblog_domain::{ResearchContext, ResearchError, ResearchSource};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-source content cap in the assembled context
const SOURCE_CHARS: usize = 1500;

/// Firecrawl `/search` client with page scraping
pub struct FirecrawlResearch {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl FirecrawlResearch {
    pub fn new(api_key: SecretString, timeout_secs: u64) -> Result<Self, ResearchError> {
        Self::with_base_url(api_key, "https://api.firecrawl.dev/v1".to_string(), timeout_secs)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, ResearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ResearchError::Config(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    #[serde(rename = "scrapeOptions")]
    scrape_options: ScrapeOptions,
}

#[derive(Serialize)]
struct ScrapeOptions {
    formats: Vec<&'static str>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn format_context(query: &str, hits: &[SearchHit]) -> String {
    let mut context = format!("Web Search Results for \"{}\":\n\n", query);
    for (index, hit) in hits.iter().enumerate() {
        let content = hit
            .markdown
            .as_deref()
            .or(hit.description.as_deref())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("No content available");
        let snippet = match content.char_indices().nth(SOURCE_CHARS) {
            Some((idx, _)) => &content[..idx],
            None => content,
        };
        context.push_str(&format!(
            "--- Source {}: {} ---\nURL: {}\nContent: {}\n\n",
            index + 1,
            hit.title.as_deref().unwrap_or("Untitled"),
            hit.url,
            snippet
        ));
    }
    context
}

#[async_trait]
impl ResearchSource for FirecrawlResearch {
    async fn search_and_scrape(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<ResearchContext, ResearchError> {
        tracing::info!(query = %query, limit, "Searching the web");

        let request = SearchRequest {
            query,
            limit,
            scrape_options: ScrapeOptions {
                formats: vec!["markdown"],
            },
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| ResearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Api(format!(
                "Search returned {}: {}",
                status, body
            )));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Api(format!("Malformed response: {}", e)))?;

        let hits: Vec<SearchHit> = search.data.into_iter().take(limit).collect();
        Ok(ResearchContext {
            text: format_context(query, &hits),
            sources: hits.into_iter().map(|h| h.url).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn research(server: &MockServer) -> FirecrawlResearch {
        FirecrawlResearch::with_base_url(SecretString::new("fc-key".into()), server.uri(), 5)
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_and_scrape() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("Authorization", "Bearer fc-key"))
            .and(body_partial_json(json!({ "query": "rust async", "limit": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [
                    { "title": "Async Book", "url": "https://rust-lang.github.io/async-book/", "markdown": "# Async" },
                    { "url": "https://tokio.rs", "description": "Tokio runtime" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let context = research(&mock_server)
            .search_and_scrape("rust async", 2)
            .await
            .unwrap();

        assert_eq!(
            context.sources,
            vec![
                "https://rust-lang.github.io/async-book/".to_string(),
                "https://tokio.rs".to_string()
            ]
        );
        assert!(context.text.starts_with("Web Search Results for \"rust async\""));
        assert!(context.text.contains("--- Source 1: Async Book ---"));
        assert!(context.text.contains("Content: Tokio runtime"));
    }

    #[tokio::test]
    async fn test_api_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(402).set_body_string("Payment required"))
            .mount(&mock_server)
            .await;

        let result = research(&mock_server).search_and_scrape("x", 1).await;
        assert!(matches!(result, Err(ResearchError::Api(m)) if m.contains("Payment required")));
    }

    #[test]
    fn test_snippets_are_capped() {
        let hits = vec![SearchHit {
            title: None,
            url: "https://a.example".to_string(),
            markdown: Some("x".repeat(5000)),
            description: None,
        }];
        let context = format_context("q", &hits);
        assert!(context.len() < SOURCE_CHARS + 200);
        assert!(context.contains("Untitled"));
    }
}
