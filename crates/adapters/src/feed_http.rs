//! HTTP RSS/Atom feed reader

use async_trait::async_trait;
use autoblog_domain::{FeedError, FeedItem, FeedReader};
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

static ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(item|entry)\b[^>]*>(.*?)</(?:item|entry)>").expect("Valid regex"));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("Valid regex"));
static RSS_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link>(.*?)</link>").expect("Valid regex"));
static ATOM_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).expect("Valid regex")
});
static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("Valid regex"));

/// Feed reader over reqwest with a regex item scanner
pub struct HttpFeedReader {
    client: Client,
}

impl HttpFeedReader {
    pub fn new(timeout_secs: u64) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("autoblog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

/// Strip CDATA wrappers and decode the common XML entities
fn clean_text(raw: &str) -> String {
    let unwrapped = CDATA.replace_all(raw, "$1");
    unwrapped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Extract items from RSS 2.0 or Atom markup
pub fn parse_feed(body: &str) -> Vec<FeedItem> {
    ITEM.captures_iter(body)
        .filter_map(|item| {
            let inner = item.get(2)?.as_str();
            let title = clean_text(TITLE.captures(inner)?.get(1)?.as_str());
            if title.is_empty() {
                return None;
            }
            let link = RSS_LINK
                .captures(inner)
                .or_else(|| ATOM_LINK.captures(inner))
                .and_then(|c| c.get(1))
                .map(|m| clean_text(m.as_str()))
                .filter(|l| !l.is_empty());
            Some(FeedItem { title, link })
        })
        .collect()
}

#[async_trait]
impl FeedReader for HttpFeedReader {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        if !body.contains("<rss") && !body.contains("<feed") && !body.contains("<rdf") {
            return Err(FeedError::Parse(format!("{} is not an RSS or Atom feed", url)));
        }

        let items = parse_feed(&body);
        tracing::debug!(url = %url, count = items.len(), "Fetched feed");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Site</title>
  <item><title><![CDATA[Tokio 2.0 & friends]]></title><link>https://a.example/tokio</link></item>
  <item><title>Rust &amp; WASM</title><link>https://a.example/wasm</link></item>
  <item><title></title></item>
</channel></rss>"#;

    const ATOM: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Site</title>
  <entry><title type="text">Zero-copy parsing</title><link rel="alternate" href="https://b.example/zc"/></entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let items = parse_feed(RSS);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Tokio 2.0 & friends");
        assert_eq!(items[0].link.as_deref(), Some("https://a.example/tokio"));
        assert_eq!(items[1].title, "Rust & WASM");
    }

    #[test]
    fn test_parse_atom() {
        let items = parse_feed(ATOM);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Zero-copy parsing");
        assert_eq!(items[0].link.as_deref(), Some("https://b.example/zc"));
    }

    #[tokio::test]
    async fn test_fetch_feed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&mock_server)
            .await;

        let reader = HttpFeedReader::new(5).unwrap();
        let items = reader
            .fetch_feed(&format!("{}/feed.xml", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_feed_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&mock_server)
            .await;

        let reader = HttpFeedReader::new(5).unwrap();
        let missing = reader
            .fetch_feed(&format!("{}/missing", mock_server.uri()))
            .await;
        assert!(matches!(missing, Err(FeedError::Status { status: 404, .. })));

        let html = reader.fetch_feed(&format!("{}/html", mock_server.uri())).await;
        assert!(matches!(html, Err(FeedError::Parse(_))));
    }
}
