//! AI provider adapters

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod openai_compat;
pub mod stub;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use stub::StubProvider;

use autoblog_domain::{AiError, PromptOptions};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Embedding model, for providers that have one
    pub embedding_model: Option<String>,
    /// Temperature (0.0-1.0)
    pub temperature: f64,
    /// Nucleus sampling
    pub top_p: Option<f64>,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on failure
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            embedding_model: None,
            temperature: 0.7,
            top_p: None,
            max_output_tokens: 4096,
            timeout_secs: 120,
            retries: 2,
        }
    }
}

/// Request parameters after applying per-call overrides
pub(crate) struct Resolved<'a> {
    pub model: &'a str,
    pub temperature: f64,
    pub system_prompt: Option<&'a str>,
    pub max_output_tokens: u32,
}

impl LlmConfig {
    pub(crate) fn resolve<'a>(&'a self, options: &'a PromptOptions) -> Resolved<'a> {
        Resolved {
            model: options.model.as_deref().unwrap_or(&self.model),
            temperature: options.temperature.unwrap_or(self.temperature),
            system_prompt: options.system_prompt.as_deref(),
            max_output_tokens: options.max_output_tokens.unwrap_or(self.max_output_tokens),
        }
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, AiError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AiError::Config(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn send_error(e: reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else {
        AiError::Provider(e.to_string())
    }
}

/// Map 429 and non-success statuses to errors
pub(crate) async fn check_status(response: Response) -> Result<Response, AiError> {
    if response.status() == 429 {
        return Err(AiError::RateLimited);
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AiError::Provider(format!(
            "API returned {}: {}",
            status, body
        )));
    }

    Ok(response)
}

/// Retry with exponential back-off. Rate limits and configuration errors are
/// returned immediately.
pub(crate) async fn with_retries<T, F, Fut>(retries: u32, what: &str, mut call: F) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut last_error = None;
    for attempt in 0..=retries {
        if attempt > 0 {
            tracing::warn!(attempt = attempt, what = what, "Retrying AI request");
            tokio::time::sleep(Duration::from_millis(500 * 2_u64.pow(attempt))).await;
        }

        match call().await {
            Ok(value) => return Ok(value),
            Err(AiError::RateLimited) => return Err(AiError::RateLimited),
            Err(e @ AiError::Config(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, what = what, "AI request failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AiError::Provider("Unknown error".to_string())))
}

/// Reject empty completions
pub(crate) fn non_empty(text: String) -> Result<String, AiError> {
    if text.trim().is_empty() {
        Err(AiError::Provider("Empty response".to_string()))
    } else {
        Ok(text)
    }
}
