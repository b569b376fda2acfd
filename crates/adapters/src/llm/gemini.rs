//! Google Gemini API adapter

use async_trait::async_trait;
use autoblog_domain::{AiError, AiProvider, PromptOptions};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LlmConfig, check_status, http_client, non_empty, send_error, with_retries};

/// Gemini text provider
pub struct GeminiProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, config: LlmConfig) -> Result<Self, AiError> {
        Self::with_base_url(
            api_key,
            "https://generativelanguage.googleapis.com/v1beta".to_string(),
            config,
        )
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
        let request = GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(resolved.temperature),
                top_p: self.config.top_p,
                max_output_tokens: Some(resolved.max_output_tokens),
            }),
            system_instruction: resolved.system_prompt.map(|system| SystemInstruction {
                parts: vec![Part {
                    text: system.to_string(),
                }],
            }),
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, resolved.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(send_error)?;

        let api_response: GeminiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("Malformed response: {}", e)))?;

        let text = api_response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        non_empty(text)
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "topP")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxOutputTokens")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn generate_text(&self, prompt: &str, options: &PromptOptions) -> Result<String, AiError> {
        with_retries(self.config.retries, "gemini text", || {
            self.call_api(prompt, options)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [
                    { "content": { "parts": [{ "text": "Gemini says hi" }] } }
                ]
            })))
            .mount(&mock_server)
            .await;

        let provider = GeminiProvider::with_base_url(
            SecretString::new("test-key".into()),
            mock_server.uri(),
            LlmConfig {
                model: "gemini-1.5-flash".to_string(),
                retries: 0,
                ..Default::default()
            },
        )
        .unwrap();

        let text = provider
            .generate_text("Hi", &PromptOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "Gemini says hi");
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let provider = GeminiProvider::with_base_url(
            SecretString::new("test-key".into()),
            mock_server.uri(),
            LlmConfig {
                retries: 3,
                ..Default::default()
            },
        )
        .unwrap();

        let result = provider.generate_text("Hi", &PromptOptions::default()).await;
        assert!(matches!(result, Err(AiError::RateLimited)));
    }
}
