//! Text generation client (Ollama-compatible chat API).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use menulens_core::{defaults, Error, GenerationBackend, Result};

/// Ollama generation backend.
///
/// Uses the `/api/chat` endpoint, which separates thinking/reasoning from
/// the final response content on models that emit it.
pub struct OllamaGeneration {
    base_url: String,
    model: String,
    client: Client,
    timeout_secs: u64,
}

impl OllamaGeneration {
    pub fn new(base_url: String, model: String) -> Self {
        let timeout_secs = std::env::var("MENULENS_GEN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::GEN_TIMEOUT_SECS);

        Self {
            base_url,
            model,
            client: Client::new(),
            timeout_secs,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE")
            .or_else(|_| std::env::var("OLLAMA_URL"))
            .unwrap_or_else(|_| defaults::OLLAMA_URL.to_string());
        let model =
            std::env::var("MENULENS_GEN_MODEL").unwrap_or_else(|_| defaults::GEN_MODEL.to_string());
        Self::new(base_url, model)
    }

    async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        let start = Instant::now();

        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Generation API returned {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse generation response: {}", e)))?;

        let content = result.message.content;
        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "providers",
            component = "generation",
            op = "generate",
            model = %self.model,
            prompt_len = prompt.len(),
            response_len = content.len(),
            duration_ms = elapsed,
            "Generation complete"
        );
        if elapsed > 15_000 {
            warn!(duration_ms = elapsed, slow = true, "Slow generation operation");
        }
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[async_trait]
impl GenerationBackend for OllamaGeneration {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(system, prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "rich coconut broth"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OllamaGeneration::new(server.uri(), "test-gen".to_string());
        assert_eq!(backend.generate("describe khao soi").await.unwrap(), "rich coconut broth");
    }

    #[tokio::test]
    async fn test_generate_with_system_sends_both_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "you are a food writer"},
                    {"role": "user", "content": "describe ramen"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "silky noodles"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OllamaGeneration::new(server.uri(), "test-gen".to_string());
        let out = backend
            .generate_with_system("you are a food writer", "describe ramen")
            .await
            .unwrap();
        assert_eq!(out, "silky noodles");
    }

    #[tokio::test]
    async fn test_http_error_maps_to_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = OllamaGeneration::new(server.uri(), "test-gen".to_string());
        assert!(matches!(
            backend.generate("prompt").await.unwrap_err(),
            Error::Provider(_)
        ));
    }

    #[test]
    fn test_model_name() {
        let backend = OllamaGeneration::new("http://x".to_string(), "gpt-oss:20b".to_string());
        assert_eq!(backend.model_name(), "gpt-oss:20b");
    }
}
