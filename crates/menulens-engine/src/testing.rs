//! Shared mock collaborators for engine unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use menulens_core::{
    DishCache, DishCacheEntry, DishCacheUpsert, Error, GenerationBackend, ImageCandidate,
    ImageSearchBackend, MenuVisionBackend, OcrBackend, Result,
};

/// In-memory dish cache with the same partial-upsert semantics as the
/// Postgres repository.
#[derive(Default)]
pub struct MemoryDishCache {
    entries: Mutex<HashMap<String, DishCacheEntry>>,
    pub fail_writes: bool,
}

impl MemoryDishCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fail_writes: true,
        }
    }

    /// Insert a fully formed entry, expiry included (for expired-row tests).
    pub async fn insert_raw(&self, entry: DishCacheEntry) {
        self.entries
            .lock()
            .await
            .insert(entry.dish_key.clone(), entry);
    }

    pub async fn get_stored(&self, key: &str) -> Option<DishCacheEntry> {
        self.entries.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl DishCache for MemoryDishCache {
    async fn get_fresh(&self, dish_key: &str) -> Result<Option<DishCacheEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(dish_key)
            .filter(|e| e.is_fresh(Utc::now()))
            .cloned())
    }

    async fn upsert(&self, dish_key: &str, entry: DishCacheUpsert) -> Result<Uuid> {
        if self.fail_writes {
            return Err(Error::Internal("cache write refused".to_string()));
        }
        let mut entries = self.entries.lock().await;
        let now = Utc::now();
        let existing = entries.get(dish_key);
        let merged = DishCacheEntry {
            id: existing.map(|e| e.id).unwrap_or_else(Uuid::now_v7),
            dish_key: dish_key.to_string(),
            display_name: entry.display_name,
            image_urls: entry
                .image_urls
                .or_else(|| existing.map(|e| e.image_urls.clone()))
                .unwrap_or_default(),
            thumbnail_url: entry
                .thumbnail_url
                .or_else(|| existing.and_then(|e| e.thumbnail_url.clone())),
            short_description: entry
                .short_description
                .or_else(|| existing.and_then(|e| e.short_description.clone())),
            metadata: entry
                .metadata
                .or_else(|| existing.map(|e| e.metadata.clone()))
                .unwrap_or_else(|| serde_json::json!({})),
            created_at: existing.map(|e| e.created_at).unwrap_or(now),
            expires_at: DishCacheEntry::default_expiry(now),
        };
        let id = merged.id;
        entries.insert(dish_key.to_string(), merged);
        Ok(id)
    }
}

/// Image search mock that counts calls and serves a fixed response.
pub struct MockImageSearch {
    pub candidates: Vec<ImageCandidate>,
    pub error: Option<fn() -> Error>,
    pub calls: AtomicUsize,
}

impl MockImageSearch {
    pub fn with_candidates(candidates: Vec<ImageCandidate>) -> Arc<Self> {
        Arc::new(Self {
            candidates,
            error: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn erroring(error: fn() -> Error) -> Arc<Self> {
        Arc::new(Self {
            candidates: vec![],
            error: Some(error),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSearchBackend for MockImageSearch {
    async fn search_images(&self, _query: &str, _count: u32) -> Result<Vec<ImageCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(make_error) = self.error {
            return Err(make_error());
        }
        Ok(self.candidates.clone())
    }
}

/// Generation mock that records prompts and serves a fixed reply.
pub struct MockGeneration {
    pub reply: String,
    pub fail: bool,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl MockGeneration {
    pub fn with_reply(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            prompts: Mutex::new(vec![]),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            prompts: Mutex::new(vec![]),
        })
    }

    pub async fn recorded_prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl GenerationBackend for MockGeneration {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .await
            .push((system.to_string(), prompt.to_string()));
        if self.fail {
            return Err(Error::Provider("generation backend down".to_string()));
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }
}

/// Vision mock serving a fixed raw reply.
pub struct MockVision {
    pub reply: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockVision {
    pub fn with_reply(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuVisionBackend for MockVision {
    async fn extract_menu(&self, _image_data: &[u8], _mime_type: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Provider("vision backend down".to_string()));
        }
        Ok(self.reply.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

/// OCR mock serving fixed text.
pub struct MockOcr {
    pub text: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockOcr {
    pub fn with_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrBackend for MockOcr {
    async fn detect_text(&self, _image_data: &[u8], _mime_type: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Provider("ocr backend down".to_string()));
        }
        Ok(self.text.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.fail)
    }
}

/// A minimal valid PNG header, enough for magic-byte sniffing.
pub fn png_bytes() -> Vec<u8> {
    let mut data = vec![0u8; 32];
    data[0..8].copy_from_slice(b"\x89PNG\r\n\x1a\n");
    data
}
