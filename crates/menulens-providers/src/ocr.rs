//! Fallback OCR client (generic document text detection over REST).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use menulens_core::{defaults, Error, OcrBackend, Result};

/// REST OCR backend: `POST {base}/v1/ocr` with base64 image, returns
/// detected text plus generic image labels.
pub struct HttpOcrClient {
    base_url: String,
    client: Client,
    timeout_secs: u64,
}

impl HttpOcrClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
            timeout_secs: defaults::OCR_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    ///
    /// Returns None when `MENULENS_OCR_URL` is unset — there is then no
    /// fallback extraction path.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(defaults::ENV_OCR_URL).ok()?;
        if base_url.is_empty() {
            return None;
        }
        Some(Self::new(base_url))
    }
}

#[derive(Serialize)]
struct OcrRequest {
    image: String, // base64 encoded
    mime_type: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    text: String,
    #[serde(default)]
    #[allow(dead_code)]
    labels: Vec<String>,
}

#[async_trait]
impl OcrBackend for HttpOcrClient {
    async fn detect_text(&self, image_data: &[u8], mime_type: &str) -> Result<String> {
        let request = OcrRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image_data),
            mime_type: mime_type.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/v1/ocr", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("OCR request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "OCR API returned {}: {}",
                status, body
            )));
        }

        let result: OcrResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse OCR response: {}", e)))?;

        debug!(
            subsystem = "providers",
            component = "ocr",
            op = "detect_text",
            response_len = result.text.len(),
            "Text detection complete"
        );
        Ok(result.text)
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_detect_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ocr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "Pad Thai\nGreen Curry\n12.99",
                "labels": ["menu", "text"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpOcrClient::new(server.uri());
        let text = client.detect_text(b"fake image", "image/png").await.unwrap();
        assert!(text.contains("Pad Thai"));
        assert!(text.contains("Green Curry"));
    }

    #[tokio::test]
    async fn test_detect_text_maps_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ocr"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpOcrClient::new(server.uri());
        let err = client.detect_text(b"fake image", "image/png").await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn test_labels_optional() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ocr"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "Ramen"})),
            )
            .mount(&server)
            .await;

        let client = HttpOcrClient::new(server.uri());
        assert_eq!(
            client.detect_text(b"img", "image/png").await.unwrap(),
            "Ramen"
        );
    }
}
