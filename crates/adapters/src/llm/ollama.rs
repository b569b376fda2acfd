//! Ollama local LLM adapter

use async_trait::async_trait;
use autoblog_domain::{AiError, AiProvider, Embedder, PromptOptions};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{LlmConfig, check_status, http_client, non_empty, send_error, with_retries};

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Ollama provider for local models, with embeddings
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    config: LlmConfig,
}

impl OllamaProvider {
    pub fn new(config: LlmConfig) -> Result<Self, AiError> {
        Self::with_base_url("http://localhost:11434".to_string(), config)
    }

    pub fn with_base_url(base_url: String, config: LlmConfig) -> Result<Self, AiError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    async fn call_api(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        let resolved = self.config.resolve(options);
        let request = OllamaRequest {
            model: resolved.model.to_string(),
            prompt: prompt.to_string(),
            system: resolved.system_prompt.map(str::to_string),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(resolved.temperature),
                top_p: self.config.top_p,
                num_predict: Some(resolved.max_output_tokens as i32),
            }),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let api_response: OllamaResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("Malformed response: {}", e)))?;

        non_empty(api_response.response)
    }

    async fn call_embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let request = EmbedRequest {
            model: self
                .config
                .embedding_model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let api_response: EmbedResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("Malformed response: {}", e)))?;

        api_response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AiError::Provider("Empty embedding".to_string()))
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl AiProvider for OllamaProvider {
    async fn generate_text(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        with_retries(self.config.retries, "ollama text", || {
            self.call_api(prompt, options)
        })
        .await
    }

    fn embedder(&self) -> Option<&dyn Embedder> {
        Some(self)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[async_trait]
impl Embedder for OllamaProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        with_retries(self.config.retries, "ollama embedding", || {
            self.call_embed(text)
        })
        .await
    }
}
