//! Collaborator contracts for external services.
//!
//! Every third-party capability sits behind one of these traits so the
//! composing layer injects concrete handles at startup and tests substitute
//! mocks. Implementations live in `menulens-providers`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{DishCacheEntry, DishCacheUpsert, ImageCandidate};
use crate::Result;

// =============================================================================
// PERSISTENT DISH CACHE
// =============================================================================

/// Persistent enrichment cache keyed by normalized dish name.
///
/// Writes are idempotent upserts; last writer wins per field. Expired
/// entries are a read-time miss, never proactively deleted.
#[async_trait]
pub trait DishCache: Send + Sync {
    /// Get a non-expired entry by normalized key.
    async fn get_fresh(&self, dish_key: &str) -> Result<Option<DishCacheEntry>>;

    /// Upsert an entry; `None` fields leave stored values untouched.
    async fn upsert(&self, dish_key: &str, entry: DishCacheUpsert) -> Result<Uuid>;
}

// =============================================================================
// VISION / OCR
// =============================================================================

/// Backend for structured menu extraction from a photo via a vision LLM.
#[async_trait]
pub trait MenuVisionBackend: Send + Sync {
    /// Run the extraction instruction over the image and return the raw
    /// structured reply (JSON text; parsing is the caller's concern so
    /// malformed output can route to the fallback path).
    async fn extract_menu(&self, image_data: &[u8], mime_type: &str) -> Result<String>;

    /// Check if the vision backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Fallback backend for plain text detection (OCR) in a photo.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Detect raw text in the image; lines separated by newlines.
    async fn detect_text(&self, image_data: &[u8], mime_type: &str) -> Result<String>;

    /// Check if the OCR backend is available.
    async fn health_check(&self) -> Result<bool>;
}

// =============================================================================
// IMAGE SEARCH
// =============================================================================

/// Backend for web image search.
#[async_trait]
pub trait ImageSearchBackend: Send + Sync {
    /// Return up to `count` ranked image candidates for the query,
    /// preferring large photographic results with safe search enabled.
    async fn search_images(&self, query: &str, count: u32) -> Result<Vec<ImageCandidate>>;
}

// =============================================================================
// TEXT GENERATION
// =============================================================================

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with system context.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
