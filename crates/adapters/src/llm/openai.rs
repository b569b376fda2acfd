//! OpenAI Responses API adapter

use async_trait::async_trait;
use autoblog_domain::{AiError, AiProvider, Embedder, PromptOptions};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LlmConfig, check_status, http_client, non_empty, send_error, with_retries};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// OpenAI provider using the Responses API, with embeddings
pub struct OpenAiProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiProvider {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Result<Self, AiError> {
        Self::with_base_url(api_key, "https://api.openai.com/v1".to_string(), config)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        config: LlmConfig,
    ) -> Result<Self, AiError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    async fn call_api(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        let resolved = self.config.resolve(options);
        let request = OpenAiRequest {
            model: resolved.model.to_string(),
            input: prompt.to_string(),
            instructions: resolved.system_prompt.map(str::to_string),
            temperature: Some(resolved.temperature),
            top_p: self.config.top_p,
            max_output_tokens: Some(resolved.max_output_tokens),
        };

        let url = format!("{}/responses", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let api_response: OpenAiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("Malformed response: {}", e)))?;

        // Responses API may also return the aggregate text directly
        if let Some(text) = api_response.output_text.filter(|t| !t.is_empty()) {
            return Ok(text);
        }

        let text = api_response
            .output
            .into_iter()
            .filter(|item| item.r#type == "message")
            .flat_map(|item| item.content)
            .filter(|c| c.r#type == "output_text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        non_empty(text)
    }

    async fn call_embeddings(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let request = EmbeddingRequest {
            model: self
                .config
                .embedding_model
                .clone()
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let api_response: EmbeddingResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("Malformed response: {}", e)))?;

        api_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AiError::Provider("Empty embedding".to_string()))
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    r#type: String,
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ContentItem {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
pub(crate) struct EmbeddingRequest {
    pub model: String,
    pub input: String,
}

#[derive(Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
pub(crate) struct EmbeddingData {
    pub embedding: Vec<f32>,
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn generate_text(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        with_retries(self.config.retries, "openai text", || {
            self.call_api(prompt, options)
        })
        .await
    }

    fn embedder(&self) -> Option<&dyn Embedder> {
        Some(self)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl Embedder for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        with_retries(self.config.retries, "openai embedding", || {
            self.call_embeddings(text)
        })
        .await
    }
}
