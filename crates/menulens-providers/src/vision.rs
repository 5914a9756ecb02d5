//! Vision/LLM menu extraction client (Ollama-compatible chat API).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use menulens_core::{defaults, Error, MenuVisionBackend, Result};

/// Extraction instruction sent with every menu photo.
///
/// The model must return a single JSON object:
/// `{"is_menu": bool, "dishes": [{"name": "...", "menu_description": "..."}]}`.
const EXTRACTION_INSTRUCTION: &str = "\
You are reading a photo of a restaurant menu. Reply with a single JSON object \
and nothing else: {\"is_menu\": boolean, \"dishes\": [{\"name\": string, \
\"menu_description\": string or null}]}.
Rules:
- First judge whether the image is a menu at all; if not, set is_menu to false \
and dishes to an empty array.
- Extract every individual dish name. Translate names into English when the \
menu is in another language.
- When a generic item sits under a food-type category heading, merge the \
category into the name (item \"Avocado\" under category \"Toast\" becomes \
\"Avocado Toast\").
- Do not include purely structural section headers such as \"Appetizers\" or \
\"Mains\" as dishes.
- When the menu prints its own description for a dish, copy it into \
menu_description; otherwise use null.";

/// Ollama-based vision extraction backend (e.g. qwen3-vl, llava).
pub struct OllamaMenuVision {
    base_url: String,
    model: String,
    client: Client,
    timeout_secs: u64,
}

impl OllamaMenuVision {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: Client::new(),
            timeout_secs: defaults::VISION_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    ///
    /// Returns None when `MENULENS_VISION_MODEL` is unset or empty — the
    /// extractor then runs on the OCR fallback alone.
    pub fn from_env() -> Option<Self> {
        let model = std::env::var(defaults::ENV_VISION_MODEL).ok()?;
        if model.is_empty() {
            return None;
        }
        let base_url = std::env::var("OLLAMA_BASE")
            .or_else(|_| std::env::var("OLLAMA_URL"))
            .unwrap_or_else(|_| defaults::OLLAMA_URL.to_string());
        Some(Self::new(base_url, model))
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>, // base64 encoded
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: serde_json::Value,
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
impl MenuVisionBackend for OllamaMenuVision {
    async fn extract_menu(&self, image_data: &[u8], _mime_type: &str) -> Result<String> {
        let start = Instant::now();
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: EXTRACTION_INSTRUCTION.to_string(),
                images: Some(vec![image_b64]),
            }],
            stream: false,
            format: serde_json::json!("json"),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse vision response: {}", e)))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            subsystem = "providers",
            component = "vision",
            op = "extract_menu",
            model = %self.model,
            response_len = result.message.content.len(),
            duration_ms = elapsed,
            "Menu extraction complete"
        );
        if elapsed > 30_000 {
            warn!(duration_ms = elapsed, slow = true, "Slow vision extraction");
        }
        Ok(result.message.content)
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
