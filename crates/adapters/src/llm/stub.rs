//! Stub provider for testing and offline mode

use async_trait::async_trait;
use autoblog_domain::{AiError, AiProvider, Embedder, PromptOptions};
use serde_json::{Map, Value};

const SCHEMA_MARKER: &str = "Respond with valid JSON matching this schema:";
const EMBEDDING_DIMENSIONS: usize = 16;

/// Deterministic provider that never touches the network.
///
/// JSON requests are answered by filling the requested schema; plain text
/// requests get a fixed reply.
pub struct StubProvider {
    text: String,
    error: Option<String>,
    embeddings: bool,
}

impl StubProvider {
    /// Replies "UNIQUE" to free-text prompts
    pub fn new() -> Self {
        Self {
            text: "UNIQUE".to_string(),
            error: None,
            embeddings: false,
        }
    }

    /// Reply with fixed text to free-text prompts
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::new()
        }
    }

    /// Fail every call with a provider error
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new()
        }
    }

    /// Also expose a hash-based embedder
    pub fn with_embeddings(mut self) -> Self {
        self.embeddings = true;
        self
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a value that satisfies a JSON schema fragment
fn fill(key: &str, schema: &Value) -> Value {
    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            let mut object = Map::new();
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                for (name, property) in properties {
                    object.insert(name.clone(), fill(name, property));
                }
            }
            Value::Object(object)
        }
        Some("array") => {
            let item = schema.get("items").cloned().unwrap_or(Value::Null);
            let value = match item.get("type").and_then(Value::as_str) {
                Some("string") | None => Value::String("Stub item".to_string()),
                Some(_) => fill(key, &item),
            };
            Value::Array(vec![value])
        }
        Some("number") | Some("integer") => Value::from(0),
        Some("boolean") => Value::Bool(false),
        _ => Value::String(format!("Stub {}", key)),
    }
}

#[async_trait]
impl AiProvider for StubProvider {
    async fn generate_text(&self, prompt: &str, _options: &PromptOptions) -> Result<String, AiError> {
        if let Some(message) = &self.error {
            return Err(AiError::Provider(message.clone()));
        }

        if let Some((_, schema_text)) = prompt.split_once(SCHEMA_MARKER) {
            let schema: Value = serde_json::from_str(schema_text.trim())
                .map_err(|e| AiError::InvalidResponseFormat(e.to_string()))?;
            return Ok(fill("value", &schema).to_string());
        }

        Ok(self.text.clone())
    }

    fn embedder(&self) -> Option<&dyn Embedder> {
        if self.embeddings { Some(self) } else { None }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[async_trait]
impl Embedder for StubProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        if let Some(message) = &self.error {
            return Err(AiError::Provider(message.clone()));
        }
        let mut vector = vec![0.0f32; EMBEDDING_DIMENSIONS];
        for (i, byte) in text.to_lowercase().bytes().enumerate() {
            vector[(byte as usize + i) % EMBEDDING_DIMENSIONS] += 1.0;
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoblog_domain::cosine_similarity;
    use serde_json::json;

    #[tokio::test]
    async fn test_fills_object_schema() {
        let stub = StubProvider::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "queries": { "type": "array", "items": { "type": "string" } }
            }
        });

        let value = stub
            .generate_json("Pick", &schema, &PromptOptions::default())
            .await
            .unwrap();
        assert_eq!(value["title"], "Stub title");
        assert_eq!(value["queries"], json!(["Stub item"]));
    }

    #[tokio::test]
    async fn test_plain_text_reply() {
        let stub = StubProvider::new();
        let text = stub.generate_text("Compare", &PromptOptions::default()).await.unwrap();
        assert_eq!(text, "UNIQUE");

        let stub = StubProvider::with_text("guide");
        let text = stub.generate_text("Choose", &PromptOptions::default()).await.unwrap();
        assert_eq!(text, "guide");
    }

    #[tokio::test]
    async fn test_error_mode() {
        let stub = StubProvider::with_error("down");
        let result = stub.generate_text("x", &PromptOptions::default()).await;
        assert!(matches!(result, Err(AiError::Provider(m)) if m == "down"));
    }

    #[tokio::test]
    async fn test_embeddings_are_deterministic() {
        let stub = StubProvider::new();
        assert!(stub.embedder().is_none());

        let stub = StubProvider::new().with_embeddings();
        let embedder = stub.embedder().unwrap();
        let a = embedder.embed("Async Rust").await.unwrap();
        let b = embedder.embed("async rust").await.unwrap();
        assert_eq!(a, b);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }
}
