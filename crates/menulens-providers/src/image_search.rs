//! Web image search client (CSE-style GET API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use menulens_core::{defaults, Error, ImageCandidate, ImageSearchBackend, Result};

/// Default search endpoint (Google Custom Search compatible).
pub const DEFAULT_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// CSE-style image search backend.
///
/// Requests large photographic results with safe search enabled; the caller
/// biases queries toward food photography with a fixed suffix.
pub struct CseImageSearch {
    endpoint: String,
    api_key: String,
    cx: String,
    client: Client,
    timeout_secs: u64,
}

impl CseImageSearch {
    pub fn new(endpoint: String, api_key: String, cx: String) -> Self {
        Self {
            endpoint,
            api_key,
            cx,
            client: Client::new(),
            timeout_secs: defaults::IMAGE_SEARCH_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    ///
    /// Returns None when `MENULENS_IMAGE_SEARCH_KEY` or
    /// `MENULENS_IMAGE_SEARCH_CX` is unset — resolution then degrades to
    /// placeholder images everywhere.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var(defaults::ENV_IMAGE_SEARCH_KEY).ok()?;
        let cx = std::env::var(defaults::ENV_IMAGE_SEARCH_CX).ok()?;
        if api_key.is_empty() || cx.is_empty() {
            return None;
        }
        let endpoint = std::env::var("MENULENS_IMAGE_SEARCH_URL")
            .unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string());
        Some(Self::new(endpoint, api_key, cx))
    }
}

#[derive(Deserialize)]
struct SearchItemImage {
    #[serde(rename = "thumbnailLink")]
    thumbnail_link: Option<String>,
}

#[derive(Deserialize)]
struct SearchItem {
    link: String,
    image: Option<SearchItemImage>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[async_trait]
impl ImageSearchBackend for CseImageSearch {
    async fn search_images(&self, query: &str, count: u32) -> Result<Vec<ImageCandidate>> {
        let count = count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(Duration::from_secs(self.timeout_secs))
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("searchType", "image"),
                ("num", count.as_str()),
                ("imgSize", "large"),
                ("imgType", "photo"),
                ("safe", "active"),
            ])
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Image search request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            // The provider's own daily quota — distinct from our limiter.
            return Err(Error::RateLimited(
                "image search provider quota exceeded".to_string(),
            ));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Image search returned {}: {}",
                status, body
            )));
        }

        let result: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse search response: {}", e)))?;

        let candidates: Vec<ImageCandidate> = result
            .items
            .into_iter()
            .map(|item| ImageCandidate {
                link: item.link,
                thumbnail: item.image.and_then(|i| i.thumbnail_link),
            })
            .collect();

        debug!(
            subsystem = "providers",
            component = "image_search",
            op = "search_images",
            query,
            result_count = candidates.len(),
            "Image search complete"
        );
        Ok(candidates)
    }
}
