//! Image resolution for dishes: cache first, then quota-gated web search.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use menulens_core::{
    defaults, normalize_dish_name, DishCache, DishCacheUpsert, Error, EventBus,
    ImageSearchBackend, ServerEvent,
};
use menulens_quota::{Decision, DeniedScope, RateLimiter};

/// Result of resolving images for one dish. Never an error: a dish without
/// a photo renders as a placeholder, not a failure.
#[derive(Debug, Clone, Default)]
pub struct ResolvedImages {
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub all_image_urls: Vec<String>,
    /// True when the daily image quota blocked this lookup, so the UI can
    /// warn that some dishes may lack photos.
    pub quota_exhausted: bool,
    /// True when the result came from the persistent cache (zero quota spent).
    pub from_cache: bool,
}

/// Cache-first dish image resolver.
pub struct ImageResolver {
    cache: Arc<dyn DishCache>,
    search: Option<Arc<dyn ImageSearchBackend>>,
    limiter: Arc<RateLimiter>,
    events: Arc<EventBus>,
}

impl ImageResolver {
    pub fn new(
        cache: Arc<dyn DishCache>,
        search: Option<Arc<dyn ImageSearchBackend>>,
        limiter: Arc<RateLimiter>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            cache,
            search,
            limiter,
            events,
        }
    }

    /// Resolve images for one dish name.
    ///
    /// Cache hits consume no external quota. Every degraded outcome (quota
    /// denial, provider error, empty results) returns nulls rather than an
    /// error.
    pub async fn resolve(&self, dish_name: &str) -> ResolvedImages {
        let dish_key = normalize_dish_name(dish_name);
        if dish_key.is_empty() {
            return ResolvedImages::default();
        }

        match self.cache.get_fresh(&dish_key).await {
            Ok(Some(entry)) if !entry.image_urls.is_empty() => {
                debug!(
                    subsystem = "engine",
                    component = "resolver",
                    op = "resolve",
                    dish_key = %dish_key,
                    "Cache hit"
                );
                return ResolvedImages {
                    image_url: entry.image_urls.first().cloned(),
                    thumbnail_url: entry.thumbnail_url.clone(),
                    all_image_urls: entry.image_urls,
                    quota_exhausted: false,
                    from_cache: true,
                };
            }
            Ok(_) => {}
            Err(e) => {
                // A cache read failure downgrades to a miss.
                warn!(dish_key = %dish_key, error = %e, "Dish cache read failed");
            }
        }

        let Some(search) = self.search.as_ref() else {
            debug!(dish_key = %dish_key, "Image search not configured, returning placeholder");
            return ResolvedImages::default();
        };

        match self
            .limiter
            .check_and_increment(defaults::API_IMAGE_SEARCH)
            .await
        {
            Decision::Allowed => {}
            Decision::Denied(scope) => {
                return ResolvedImages {
                    quota_exhausted: scope == DeniedScope::Day,
                    ..Default::default()
                };
            }
        }

        let query = format!("{} {}", dish_name.trim(), defaults::IMAGE_QUERY_SUFFIX);
        let start = Instant::now();
        let result = search
            .search_images(&query, defaults::IMAGE_CANDIDATES)
            .await;
        self.events.emit(ServerEvent::ApiCall {
            api: defaults::API_IMAGE_SEARCH.to_string(),
            duration_ms: Some(start.elapsed().as_millis() as u64),
            success: result.is_ok(),
        });

        let candidates = match result {
            Ok(candidates) if !candidates.is_empty() => candidates,
            Ok(_) => {
                debug!(dish_key = %dish_key, "Image search returned no candidates");
                return ResolvedImages::default();
            }
            Err(Error::RateLimited(msg)) => {
                // The provider's own daily quota tripped.
                warn!(dish_key = %dish_key, error = %msg, "Image search provider quota exceeded");
                return ResolvedImages {
                    quota_exhausted: true,
                    ..Default::default()
                };
            }
            Err(e) => {
                warn!(dish_key = %dish_key, error = %e, "Image search failed");
                return ResolvedImages::default();
            }
        };

        let image_url = candidates.first().map(|c| c.link.clone());
        let thumbnail_url = candidates.first().and_then(|c| c.thumbnail.clone());
        let all_image_urls: Vec<String> = candidates.iter().map(|c| c.link.clone()).collect();

        // Best-effort write-back; a cache failure must not fail the resolve.
        let upsert = DishCacheUpsert {
            display_name: dish_name.trim().to_string(),
            image_urls: Some(all_image_urls.clone()),
            thumbnail_url: thumbnail_url.clone(),
            ..Default::default()
        };
        if let Err(e) = self.cache.upsert(&dish_key, upsert).await {
            warn!(dish_key = %dish_key, error = %e, "Dish cache write failed");
        }

        ResolvedImages {
            image_url,
            thumbnail_url,
            all_image_urls,
            quota_exhausted: false,
            from_cache: false,
        }
    }

    /// Resolve many dish names in small concurrent batches with a short
    /// inter-batch delay — courtesy toward the search provider, traded
    /// against latency. Results are positional.
    pub async fn resolve_many(&self, dish_names: &[String]) -> Vec<ResolvedImages> {
        let mut results = Vec::with_capacity(dish_names.len());
        for (i, chunk) in dish_names.chunks(defaults::IMAGE_BATCH_SIZE).enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(defaults::IMAGE_BATCH_DELAY_MS)).await;
            }
            let batch = futures::future::join_all(chunk.iter().map(|name| self.resolve(name)));
            results.extend(batch.await);
        }
        results
    }
}
