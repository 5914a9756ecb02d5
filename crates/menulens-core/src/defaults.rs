//! Centralized default constants for the menulens system.
//!
//! **This module is the single source of truth** for all shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// EXTERNAL API QUOTAS
// =============================================================================

/// API name for the primary vision/LLM menu extractor.
pub const API_VISION: &str = "vision";

/// API name for the fallback OCR text detector.
pub const API_OCR: &str = "ocr";

/// API name for the web image search collaborator.
pub const API_IMAGE_SEARCH: &str = "image-search";

/// API name for the text-generation collaborator.
pub const API_GENERATION: &str = "generation";

/// Vision/LLM calls per minute.
pub const VISION_PER_MINUTE: u64 = 20;

/// Vision/LLM calls per calendar day.
pub const VISION_PER_DAY: u64 = 500;

/// OCR calls per minute (the fallback is cheaper than the primary).
pub const OCR_PER_MINUTE: u64 = 100;

/// OCR calls per calendar day.
pub const OCR_PER_DAY: u64 = 5000;

/// Image-search calls per minute.
pub const IMAGE_SEARCH_PER_MINUTE: u64 = 90;

/// Image-search calls per calendar day (free-tier CSE quota minus headroom).
pub const IMAGE_SEARCH_PER_DAY: u64 = 280;

/// Generation calls per minute.
pub const GENERATION_PER_MINUTE: u64 = 30;

/// Generation calls per calendar day.
pub const GENERATION_PER_DAY: u64 = 1500;

/// Sliding-window length for per-minute quotas, in milliseconds.
pub const QUOTA_WINDOW_MS: u64 = 60_000;

/// Daily-bucket TTL in seconds (24h, self-cleaning).
pub const QUOTA_DAY_TTL_SECS: u64 = 86_400;

/// Daily usage fraction that triggers the first escalating warning.
pub const QUOTA_WARN_THRESHOLD: f64 = 0.8;

/// Daily usage fraction that triggers the second escalating warning.
pub const QUOTA_CRITICAL_THRESHOLD: f64 = 0.9;

// =============================================================================
// DISH CACHE
// =============================================================================

/// Dish cache entry lifetime in days.
pub const DISH_CACHE_TTL_DAYS: i64 = 90;

/// Number of image candidates requested per dish.
pub const IMAGE_CANDIDATES: u32 = 3;

/// Suffix appended to image-search queries to bias toward food photography.
pub const IMAGE_QUERY_SUFFIX: &str = "food dish photo";

/// Batch size for chunked multi-dish image resolution.
pub const IMAGE_BATCH_SIZE: usize = 5;

/// Delay between image resolution batches in milliseconds.
pub const IMAGE_BATCH_DELAY_MS: u64 = 500;

/// Process-local description memo capacity (entries).
pub const DESCRIPTION_MEMO_CAPACITY: usize = 512;

/// Fallback text served when description generation is unavailable.
pub const DESCRIPTION_UNAVAILABLE: &str = "Description temporarily unavailable";

// =============================================================================
// EXTRACTION
// =============================================================================

/// Minimum words for an OCR line to qualify as a dish-name candidate.
pub const OCR_LINE_MIN_WORDS: usize = 2;

/// Maximum words for an OCR line to qualify as a dish-name candidate.
pub const OCR_LINE_MAX_WORDS: usize = 10;

/// Maximum characters for an OCR line to qualify as a dish-name candidate.
pub const OCR_LINE_MAX_CHARS: usize = 50;

/// Target language dish names are translated into.
pub const EXTRACTION_LANGUAGE: &str = "English";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default inbound rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default inbound rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Maximum uploaded menu photo size in bytes (10 MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// End-to-end analysis deadline in seconds (maps to HTTP 504 when exceeded).
pub const ANALYZE_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// PROVIDERS
// =============================================================================

/// Default Ollama-compatible base URL for vision and generation.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default vision model name.
pub const VISION_MODEL: &str = "qwen3-vl:8b";

/// Default generation model name.
pub const GEN_MODEL: &str = "gpt-oss:20b";

/// Timeout for vision extraction requests in seconds.
pub const VISION_TIMEOUT_SECS: u64 = 60;

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 30;

/// Timeout for OCR requests in seconds.
pub const OCR_TIMEOUT_SECS: u64 = 20;

/// Timeout for image-search requests in seconds.
pub const IMAGE_SEARCH_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming the vision model (empty disables the primary path).
pub const ENV_VISION_MODEL: &str = "MENULENS_VISION_MODEL";

/// Environment variable for the OCR service base URL.
pub const ENV_OCR_URL: &str = "MENULENS_OCR_URL";

/// Environment variable for the image-search API key.
pub const ENV_IMAGE_SEARCH_KEY: &str = "MENULENS_IMAGE_SEARCH_KEY";

/// Environment variable for the image-search engine/context identifier.
pub const ENV_IMAGE_SEARCH_CX: &str = "MENULENS_IMAGE_SEARCH_CX";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_defaults_sane() {
        assert!(VISION_PER_MINUTE < VISION_PER_DAY);
        assert!(OCR_PER_MINUTE < OCR_PER_DAY);
        assert!(QUOTA_WARN_THRESHOLD < QUOTA_CRITICAL_THRESHOLD);
        assert!(QUOTA_CRITICAL_THRESHOLD < 1.0);
    }

    #[test]
    fn test_ocr_heuristic_bounds() {
        assert!(OCR_LINE_MIN_WORDS < OCR_LINE_MAX_WORDS);
        assert_eq!(OCR_LINE_MAX_CHARS, 50);
    }
}
