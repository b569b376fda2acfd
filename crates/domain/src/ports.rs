//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::json::extract_json;
use crate::model::{
    CommitReceipt, FeedItem, FileChange, MEMORY_SIZE, Post, PostFilter, ResearchContext, Schedule,
};

/// Temperature used for structured output
pub const STRICT_TEMPERATURE: f64 = 0.1;

const JSON_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that outputs only valid JSON. Do not include markdown code blocks.";

/// Error type for AI provider operations
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider error: {0}")]
    Provider(String),
    #[error("Invalid response format: {0}")]
    InvalidResponseFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Per-call overrides for text generation
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub system_prompt: Option<String>,
    pub max_output_tokens: Option<u32>,
}

impl PromptOptions {
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(prompt.into()),
            ..Default::default()
        }
    }
}

/// Port for text-generating models
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate free text for a prompt
    async fn generate_text(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError>;

    /// Generate a JSON value conforming to `schema`.
    ///
    /// The schema is appended to the prompt and the reply is parsed after
    /// stripping code fences. Any parse failure is `InvalidResponseFormat`.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &Value,
        options: &PromptOptions,
    ) -> Result<Value, AiError> {
        let schema_text = serde_json::to_string_pretty(schema)
            .map_err(|e| AiError::InvalidResponseFormat(e.to_string()))?;
        let full_prompt = format!(
            "{}\n\nRespond with valid JSON matching this schema:\n{}",
            prompt, schema_text
        );

        let strict = PromptOptions {
            model: options.model.clone(),
            temperature: Some(STRICT_TEMPERATURE),
            system_prompt: Some(JSON_SYSTEM_PROMPT.to_string()),
            max_output_tokens: options.max_output_tokens,
        };

        let text = self.generate_text(&full_prompt, &strict).await?;
        serde_json::from_str(extract_json(&text)).map_err(|e| {
            AiError::InvalidResponseFormat(format!("Failed to parse JSON: {}", e))
        })
    }

    /// Embedding capability, if the provider has one
    fn embedder(&self) -> Option<&dyn Embedder> {
        None
    }

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Generate and deserialize a structured object
pub async fn generate_object<T: DeserializeOwned>(
    ai: &dyn AiProvider,
    prompt: &str,
    schema: &Value,
    options: &PromptOptions,
) -> Result<T, AiError> {
    let value = ai.generate_json(prompt, schema, options).await?;
    serde_json::from_value(value)
        .map_err(|e| AiError::InvalidResponseFormat(format!("Unexpected shape: {}", e)))
}

/// Port for text embeddings
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;
}

/// Error type for post storage
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Persistence failed: {0}")]
    Persistence(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Invalid slug '{0}': must match [a-z0-9_-]+")]
    InvalidSlug(String),
}

/// Reject slugs that could escape a storage namespace
pub fn validate_slug(slug: &str) -> Result<(), StoreError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSlug(slug.to_string()))
    }
}

/// Port for post persistence
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Get a post by slug; absent is `Ok(None)`
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, StoreError>;

    /// List posts newest-first
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError>;

    /// Upsert by slug, keeping the original `created_at`
    async fn save_post(&self, post: &Post) -> Result<Post, StoreError>;

    /// Remove a post; returns whether anything was removed
    async fn delete_post(&self, slug: &str) -> Result<bool, StoreError>;

    /// Titles of the most recent posts, newest first
    async fn memory(&self) -> Result<Vec<String>, StoreError> {
        let posts = self.list_posts(&PostFilter::recent(MEMORY_SIZE)).await?;
        Ok(posts.into_iter().map(|p| p.title).collect())
    }

    /// Vector search capability, if the store has one
    fn semantic_index(&self) -> Option<&dyn SemanticIndex> {
        None
    }
}

/// Port for embedding similarity search over posts
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn save_embedding(&self, slug: &str, embedding: &[f32]) -> Result<(), StoreError>;

    /// Slugs whose stored embedding is at least `threshold` similar, best first
    async fn find_similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

/// Error type for feed fetching
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Port for reading RSS/Atom feeds
#[async_trait]
pub trait FeedReader: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>, FeedError>;
}

/// Error type for web research
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Research API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for search-and-scrape web research
#[async_trait]
pub trait ResearchSource: Send + Sync {
    async fn search_and_scrape(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<ResearchContext, ResearchError>;
}

/// Error type for research report storage
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report not found: {0}")]
    NotFound(String),
    #[error("Invalid report name '{0}'")]
    InvalidName(String),
}

/// Port for deep-research report files
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Content of the most recent report, if any exist
    async fn latest_report(&self) -> Result<Option<String>, ReportError>;

    async fn read_report(&self, name: &str) -> Result<String, ReportError>;

    async fn write_report(&self, name: &str, content: &str) -> Result<(), ReportError>;
}

/// Error type for the remote commit service
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for the version-controlled remote (commits and workflow dispatch)
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Commit all files atomically in one commit
    async fn commit_files(
        &self,
        files: &[FileChange],
        message: &str,
    ) -> Result<CommitReceipt, RemoteError>;

    async fn delete_file(&self, path: &str, message: &str) -> Result<(), RemoteError>;

    /// Dispatch the deep-research workflow
    async fn trigger_workflow(&self, topic: &str, typology: &str) -> Result<(), RemoteError>;
}

/// Error type for trigger persistence
#[derive(Debug, Error)]
pub enum ScheduleStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Port for persisting schedules
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Schedule>, ScheduleStoreError>;

    async fn save(&self, schedules: &[Schedule]) -> Result<(), ScheduleStoreError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Port for randomness (enables deterministic testing)
pub trait Dice: Send + Sync {
    /// Uniform draw in `[0, 1)`
    fn unit(&self) -> f64;

    /// Uniform index in `0..len`; `len` must be non-zero
    fn index(&self, len: usize) -> usize;
}

/// Thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDice;

impl Dice for SystemDice {
    fn unit(&self) -> f64 {
        rand::random::<f64>()
    }

    fn index(&self, len: usize) -> usize {
        use rand::Rng;
        rand::thread_rng().gen_range(0..len.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        reply: String,
        seen: Mutex<Vec<(String, PromptOptions)>>,
    }

    #[async_trait]
    impl AiProvider for Canned {
        async fn generate_text(
            &self,
            prompt: &str,
            options: &PromptOptions,
        ) -> Result<String, AiError> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), options.clone()));
            Ok(self.reply.clone())
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    #[derive(Deserialize)]
    struct Topic {
        title: String,
    }

    #[tokio::test]
    async fn test_generate_object_uses_strict_options() {
        let ai = Canned {
            reply: "```json\n{\"title\": \"Hello\"}\n```".to_string(),
            seen: Mutex::new(vec![]),
        };
        let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});

        let topic: Topic = generate_object(&ai, "Pick a topic", &schema, &PromptOptions::default())
            .await
            .unwrap();
        assert_eq!(topic.title, "Hello");

        let seen = ai.seen.lock().unwrap();
        let (prompt, options) = &seen[0];
        assert!(prompt.starts_with("Pick a topic"));
        assert!(prompt.contains("\"properties\""));
        assert_eq!(options.temperature, Some(STRICT_TEMPERATURE));
        assert!(options.system_prompt.as_deref().unwrap().contains("only valid JSON"));
    }

    #[tokio::test]
    async fn test_generate_object_rejects_non_json() {
        let ai = Canned {
            reply: "I cannot do that".to_string(),
            seen: Mutex::new(vec![]),
        };
        let result: Result<Topic, _> =
            generate_object(&ai, "x", &json!({}), &PromptOptions::default()).await;
        assert!(matches!(result, Err(AiError::InvalidResponseFormat(_))));
    }

    #[tokio::test]
    async fn test_generate_object_rejects_wrong_shape() {
        let ai = Canned {
            reply: r#"{"headline": "no title field"}"#.to_string(),
            seen: Mutex::new(vec![]),
        };
        let result: Result<Topic, _> =
            generate_object(&ai, "x", &json!({}), &PromptOptions::default()).await;
        assert!(matches!(result, Err(AiError::InvalidResponseFormat(_))));
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("hello-world_2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("../etc/passwd").is_err());
        assert!(validate_slug("Hello").is_err());
    }
}
