//! Anthropic Messages API adapter

use async_trait::async_trait;
use autoblog_domain::{AiError, AiProvider, PromptOptions};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LlmConfig, check_status, http_client, non_empty, send_error, with_retries};

/// Anthropic text provider
pub struct AnthropicProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Result<Self, AiError> {
        Self::with_base_url(api_key, "https://api.anthropic.com/v1".to_string(), config)
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
        let request = AnthropicRequest {
            model: resolved.model.to_string(),
            max_tokens: resolved.max_output_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: resolved.system_prompt.map(str::to_string),
            temperature: Some(resolved.temperature),
            top_p: self.config.top_p,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let api_response: AnthropicResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("Malformed response: {}", e)))?;

        let text = api_response
            .content
            .into_iter()
            .filter(|c| c.r#type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        non_empty(text)
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    async fn generate_text(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        with_retries(self.config.retries, "anthropic text", || {
            self.call_api(prompt, options)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::with_base_url(
            SecretString::new("test-key".into()),
            server.uri(),
            LlmConfig {
                model: "claude-sonnet".to_string(),
                retries: 0,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_text_with_system_prompt() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(body_partial_json(json!({ "system": "Be brief", "model": "claude-sonnet" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    { "type": "text", "text": "Short " },
                    { "type": "text", "text": "answer" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let text = provider(&mock_server)
            .generate_text("Explain", &PromptOptions::with_system("Be brief"))
            .await
            .unwrap();
        assert_eq!(text, "Short answer");
        assert!(provider(&mock_server).embedder().is_none());
    }

    #[tokio::test]
    async fn test_empty_content_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server)
            .generate_text("x", &PromptOptions::default())
            .await;
        assert!(matches!(result, Err(AiError::Provider(_))));
    }
}
