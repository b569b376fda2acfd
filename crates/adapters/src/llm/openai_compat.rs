//! OpenAI-compatible chat completions adapter for generic providers

use async_trait::async_trait;
use autoblog_domain::{AiError, AiProvider, Embedder, PromptOptions};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::openai::{EmbeddingRequest, EmbeddingResponse};
use super::{LlmConfig, check_status, http_client, non_empty, send_error, with_retries};

/// OpenAI-compatible provider for third-party endpoints.
///
/// Embeddings are offered only when an embedding model is configured.
pub struct OpenAiCompatProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: SecretString, base_url: String, config: LlmConfig) -> Result<Self, AiError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    async fn call_api(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        let resolved = self.config.resolve(options);
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = resolved.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = ChatCompletionRequest {
            model: resolved.model.to_string(),
            messages,
            temperature: Some(resolved.temperature),
            top_p: self.config.top_p,
            max_tokens: Some(resolved.max_output_tokens),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let api_response: ChatCompletionResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("Malformed response: {}", e)))?;

        let text = api_response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join("");

        non_empty(text)
    }

    async fn call_embeddings(&self, model: &str, text: &str) -> Result<Vec<f32>, AiError> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&EmbeddingRequest {
                model: model.to_string(),
                input: text.to_string(),
            })
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
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl AiProvider for OpenAiCompatProvider {
    async fn generate_text(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        with_retries(self.config.retries, "openai-compatible text", || {
            self.call_api(prompt, options)
        })
        .await
    }

    fn embedder(&self) -> Option<&dyn Embedder> {
        self.config.embedding_model.as_ref().map(|_| self as &dyn Embedder)
    }

    fn name(&self) -> &'static str {
        "openai_compat"
    }
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let model = self
            .config
            .embedding_model
            .as_deref()
            .ok_or_else(|| AiError::Config("No embedding model configured".to_string()))?;
        with_retries(self.config.retries, "openai-compatible embedding", || {
            self.call_embeddings(model, text)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_completion_with_system_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "messages": [
                    { "role": "system", "content": "JSON only" },
                    { "role": "user", "content": "Hi" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "compat reply" } }]
            })))
            .mount(&mock_server)
            .await;

        let provider = OpenAiCompatProvider::new(
            SecretString::new("test-key".into()),
            mock_server.uri(),
            LlmConfig {
                retries: 0,
                ..Default::default()
            },
        )
        .unwrap();

        let text = provider
            .generate_text("Hi", &PromptOptions::with_system("JSON only"))
            .await
            .unwrap();
        assert_eq!(text, "compat reply");
        assert!(provider.embedder().is_none());
    }

    #[tokio::test]
    async fn test_embeddings_when_model_configured() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(json!({ "model": "bge-small" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "embedding": [1.0] }] })),
            )
            .mount(&mock_server)
            .await;

        let provider = OpenAiCompatProvider::new(
            SecretString::new("test-key".into()),
            mock_server.uri(),
            LlmConfig {
                embedding_model: Some("bge-small".to_string()),
                retries: 0,
                ..Default::default()
            },
        )
        .unwrap();

        let vector = provider.embedder().unwrap().embed("x").await.unwrap();
        assert_eq!(vector, vec![1.0]);
    }
}
