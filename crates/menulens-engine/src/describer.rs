//! Dish description generation with a two-tier cache.
//!
//! Tier 1 is a process-local LRU memo keyed by (operation kind, normalized
//! dish name, grounding context). It has no TTL of its own and clears only
//! on restart; multi-instance deployments will have divergent memos, which
//! is acceptable because tier 2 — the persistent dish cache — is the source
//! of truth for short descriptions.
//!
//! Both operations never fail: any quota denial or provider error yields a
//! fixed unavailable string so description absence cannot block the
//! pipeline.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use menulens_core::{
    defaults, normalize_dish_name, DishCache, DishCacheUpsert, EventBus, GenerationBackend,
    ServerEvent,
};
use menulens_quota::Decision;

const SYSTEM_FOOD_WRITER: &str = "You are a concise food writer. Reply with only the \
requested text, no preamble and no quotation marks.";

/// Two-tier cached description generator.
pub struct DescriptionGenerator {
    generation: Option<Arc<dyn GenerationBackend>>,
    cache: Arc<dyn DishCache>,
    limiter: Arc<menulens_quota::RateLimiter>,
    events: Arc<EventBus>,
    memo: Mutex<LruCache<String, String>>,
}

impl DescriptionGenerator {
    pub fn new(
        generation: Option<Arc<dyn GenerationBackend>>,
        cache: Arc<dyn DishCache>,
        limiter: Arc<menulens_quota::RateLimiter>,
        events: Arc<EventBus>,
    ) -> Self {
        let capacity = NonZeroUsize::new(defaults::DESCRIPTION_MEMO_CAPACITY)
            .expect("memo capacity is non-zero");
        Self {
            generation,
            cache,
            limiter,
            events,
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// A few flavor-evoking words for a dish. Never restates the dish name.
    pub async fn short_description(&self, dish_name: &str) -> String {
        let dish_key = normalize_dish_name(dish_name);
        let memo_key = format!("short:{}", dish_key);

        if let Some(hit) = self.memo.lock().await.get(&memo_key) {
            return hit.clone();
        }

        // Persistent tier before any external call.
        if let Ok(Some(entry)) = self.cache.get_fresh(&dish_key).await {
            if let Some(desc) = entry.short_description.filter(|d| !d.is_empty()) {
                self.memo.lock().await.put(memo_key, desc.clone());
                return desc;
            }
        }

        let prompt = format!(
            "In three to six words, evoke the flavors and key ingredients of \
             the dish \"{}\". Do not restate the dish name. No punctuation.",
            dish_name.trim()
        );
        let Some(text) = self.generate(&prompt).await else {
            return defaults::DESCRIPTION_UNAVAILABLE.to_string();
        };

        self.memo.lock().await.put(memo_key, text.clone());

        // Best-effort persistent write-back.
        let upsert = DishCacheUpsert {
            display_name: dish_name.trim().to_string(),
            short_description: Some(text.clone()),
            ..Default::default()
        };
        if let Err(e) = self.cache.upsert(&dish_key, upsert).await {
            warn!(dish_key = %dish_key, error = %e, "Short description cache write failed");
        }

        text
    }

    /// One to two natural sentences about a dish, grounded on the menu's own
    /// description when one was printed.
    pub async fn detailed_description(
        &self,
        dish_name: &str,
        menu_description: Option<&str>,
    ) -> String {
        let dish_key = normalize_dish_name(dish_name);
        let context = menu_description.unwrap_or("").trim();
        let memo_key = format!("detail:{}:{}", dish_key, context.to_lowercase());

        if let Some(hit) = self.memo.lock().await.get(&memo_key) {
            return hit.clone();
        }

        let prompt = if context.is_empty() {
            format!(
                "In one or two sentences, describe the dish \"{}\" for a diner \
                 deciding what to order: preparation, key ingredients, and taste.",
                dish_name.trim()
            )
        } else {
            format!(
                "In one or two sentences, describe the dish \"{}\" for a diner \
                 deciding what to order. The menu describes it as: \"{}\". Stay \
                 consistent with that description.",
                dish_name.trim(),
                context
            )
        };

        let Some(text) = self.generate(&prompt).await else {
            return defaults::DESCRIPTION_UNAVAILABLE.to_string();
        };

        self.memo.lock().await.put(memo_key, text.clone());
        text
    }

    /// Shared quota-gated generation step. None means "use the fallback".
    async fn generate(&self, prompt: &str) -> Option<String> {
        let backend = self.generation.as_ref()?;

        match self
            .limiter
            .check_and_increment(defaults::API_GENERATION)
            .await
        {
            Decision::Allowed => {}
            Decision::Denied(_) => return None,
        }

        let start = Instant::now();
        let result = backend.generate_with_system(SYSTEM_FOOD_WRITER, prompt).await;
        self.events.emit(ServerEvent::ApiCall {
            api: defaults::API_GENERATION.to_string(),
            duration_ms: Some(start.elapsed().as_millis() as u64),
            success: result.is_ok(),
        });

        match result {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    debug!(
                        subsystem = "engine",
                        component = "describer",
                        response_len = text.len(),
                        "Description generated"
                    );
                    Some(text)
                }
            }
            Err(e) => {
                warn!(error = %e, "Description generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryDishCache, MockGeneration};
    use chrono::{Duration as ChronoDuration, Utc};
    use menulens_core::DishCacheEntry;
    use menulens_quota::{ApiQuota, MemoryCounterStore, RateLimiter};
    use uuid::Uuid;

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(
            Arc::new(MemoryCounterStore::new()),
            Arc::new(EventBus::new(32)),
        ))
    }

    fn describer_with(
        generation: Option<Arc<MockGeneration>>,
        cache: Arc<MemoryDishCache>,
        limiter: Arc<RateLimiter>,
    ) -> DescriptionGenerator {
        DescriptionGenerator::new(
            generation.map(|g| g as Arc<dyn GenerationBackend>),
            cache,
            limiter,
            Arc::new(EventBus::new(32)),
        )
    }

    #[tokio::test]
    async fn test_short_description_generated_and_memoized() {
        let generation = MockGeneration::with_reply("tangy tamarind noodles");
        let cache = Arc::new(MemoryDishCache::new());
        let describer = describer_with(Some(generation.clone()), cache.clone(), limiter());

        assert_eq!(
            describer.short_description("Pad Thai").await,
            "tangy tamarind noodles"
        );
        // Second call is memoized — no further prompts recorded
        assert_eq!(
            describer.short_description("Pad Thai").await,
            "tangy tamarind noodles"
        );
        assert_eq!(generation.recorded_prompts().await.len(), 1);

        // And the persistent tier got the write-back
        let stored = cache.get_stored("pad thai").await.unwrap();
        assert_eq!(
            stored.short_description.as_deref(),
            Some("tangy tamarind noodles")
        );
    }

    #[tokio::test]
    async fn test_short_description_served_from_persistent_tier() {
        let generation = MockGeneration::with_reply("should never run");
        let cache = Arc::new(MemoryDishCache::new());
        let now = Utc::now();
        cache
            .insert_raw(DishCacheEntry {
                id: Uuid::now_v7(),
                dish_key: "ramen".to_string(),
                display_name: "Ramen".to_string(),
                image_urls: vec![],
                thumbnail_url: None,
                short_description: Some("rich pork broth".to_string()),
                metadata: serde_json::json!({}),
                created_at: now,
                expires_at: now + ChronoDuration::days(30),
            })
            .await;
        let describer = describer_with(Some(generation.clone()), cache, limiter());

        assert_eq!(describer.short_description("Ramen").await, "rich pork broth");
        assert!(generation.recorded_prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_backend_yields_fallback() {
        let describer = describer_with(None, Arc::new(MemoryDishCache::new()), limiter());
        assert_eq!(
            describer.short_description("Pad Thai").await,
            defaults::DESCRIPTION_UNAVAILABLE
        );
        assert_eq!(
            describer.detailed_description("Pad Thai", None).await,
            defaults::DESCRIPTION_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_provider_error_yields_fallback() {
        let describer = describer_with(
            Some(MockGeneration::failing()),
            Arc::new(MemoryDishCache::new()),
            limiter(),
        );
        assert_eq!(
            describer.short_description("Pad Thai").await,
            defaults::DESCRIPTION_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_rate_limit_denial_yields_fallback() {
        let limiter = Arc::new(
            RateLimiter::new(
                Arc::new(MemoryCounterStore::new()),
                Arc::new(EventBus::new(32)),
            )
            .with_quota(
                defaults::API_GENERATION,
                ApiQuota {
                    per_minute: 1,
                    per_day: 1,
                },
            ),
        );
        let generation = MockGeneration::with_reply("smoky grilled goodness");
        let describer = describer_with(
            Some(generation),
            Arc::new(MemoryDishCache::new()),
            limiter,
        );

        assert_eq!(
            describer.short_description("Dish One").await,
            "smoky grilled goodness"
        );
        assert_eq!(
            describer.short_description("Dish Two").await,
            defaults::DESCRIPTION_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_detailed_description_grounds_on_menu_text() {
        let generation = MockGeneration::with_reply("A comforting bowl.");
        let describer = describer_with(
            Some(generation.clone()),
            Arc::new(MemoryDishCache::new()),
            limiter(),
        );

        describer
            .detailed_description("Khao Soi", Some("northern curry noodles"))
            .await;
        let prompts = generation.recorded_prompts().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].1.contains("northern curry noodles"));
        assert!(prompts[0].1.contains("Khao Soi"));
    }

    #[tokio::test]
    async fn test_detailed_memo_distinguishes_context() {
        let generation = MockGeneration::with_reply("Some sentence.");
        let describer = describer_with(
            Some(generation.clone()),
            Arc::new(MemoryDishCache::new()),
            limiter(),
        );

        describer.detailed_description("Khao Soi", None).await;
        describer
            .detailed_description("Khao Soi", Some("with chicken"))
            .await;
        describer.detailed_description("Khao Soi", None).await;
        // Two distinct (name, context) pairs, third call memoized
        assert_eq!(generation.recorded_prompts().await.len(), 2);
    }
}
