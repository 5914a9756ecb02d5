//! Per-photo analysis pipeline: extraction, then fan-out enrichment.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use menulens_core::{Dish, EventBus, MenuAnalysis, Result, ServerEvent};

use crate::describer::DescriptionGenerator;
use crate::extractor::VisionExtractor;
use crate::resolver::ImageResolver;

/// Composes the extractor, resolver, and describer into the `/analyze` flow.
pub struct MenuAnalyzer {
    extractor: VisionExtractor,
    resolver: Arc<ImageResolver>,
    describer: Arc<DescriptionGenerator>,
    events: Arc<EventBus>,
}

impl MenuAnalyzer {
    pub fn new(
        extractor: VisionExtractor,
        resolver: Arc<ImageResolver>,
        describer: Arc<DescriptionGenerator>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            describer,
            events,
        }
    }

    /// Analyze one menu photo: extract dish candidates, then enrich each
    /// with an image and a short description concurrently.
    ///
    /// Enrichment runs with full per-dish fan-out; results are reassembled
    /// positionally to match extraction order. Enrichment degradation (null
    /// image, fallback text) never fails the call. Dropping the returned
    /// future abandons in-flight collaborator calls; any cache upserts they
    /// had already issued are idempotent and harmless.
    pub async fn analyze(&self, image_data: &[u8]) -> Result<MenuAnalysis> {
        let start = Instant::now();
        let extraction = self.extractor.extract(image_data).await?;

        if !extraction.is_menu {
            debug!(
                subsystem = "engine",
                component = "pipeline",
                "Image is not a menu, skipping enrichment"
            );
            self.events.emit(ServerEvent::DishAnalyzed {
                dish_count: 0,
                is_menu: false,
                cache_hits: 0,
            });
            return Ok(MenuAnalysis {
                dishes: vec![],
                is_menu: false,
                image_quota_exceeded: false,
            });
        }

        let enrichments = extraction.dishes.iter().map(|extracted| async {
            let (images, description) = futures::join!(
                self.resolver.resolve(&extracted.name),
                self.describer.short_description(&extracted.name)
            );
            (images, description)
        });
        let enriched = futures::future::join_all(enrichments).await;

        let mut image_quota_exceeded = false;
        let mut cache_hits = 0;
        let dishes: Vec<Dish> = extraction
            .dishes
            .into_iter()
            .zip(enriched)
            .map(|(extracted, (images, description))| {
                image_quota_exceeded |= images.quota_exhausted;
                cache_hits += images.from_cache as usize;
                Dish {
                    name: extracted.name,
                    description,
                    image_url: images.image_url,
                    thumbnail_url: images.thumbnail_url,
                    all_image_urls: images.all_image_urls,
                    menu_description: extracted.menu_description,
                }
            })
            .collect();

        info!(
            subsystem = "engine",
            component = "pipeline",
            op = "analyze",
            dish_count = dishes.len(),
            cache_hits,
            image_quota_exceeded,
            duration_ms = start.elapsed().as_millis() as u64,
            "Menu analysis complete"
        );
        self.events.emit(ServerEvent::DishAnalyzed {
            dish_count: dishes.len(),
            is_menu: true,
            cache_hits,
        });

        Ok(MenuAnalysis {
            dishes,
            is_menu: true,
            image_quota_exceeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{png_bytes, MemoryDishCache, MockGeneration, MockImageSearch, MockVision};
    use menulens_core::{
        defaults, GenerationBackend, ImageCandidate, ImageSearchBackend, MenuVisionBackend,
    };
    use menulens_quota::{ApiQuota, MemoryCounterStore, RateLimiter};

    struct Fixture {
        analyzer: MenuAnalyzer,
        search: Arc<MockImageSearch>,
        generation: Arc<MockGeneration>,
        vision: Arc<MockVision>,
    }

    fn fixture(vision_reply: &str, image_quota: Option<ApiQuota>) -> Fixture {
        let events = Arc::new(EventBus::new(32));
        let mut limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()), events.clone());
        if let Some(quota) = image_quota {
            limiter = limiter.with_quota(defaults::API_IMAGE_SEARCH, quota);
        }
        let limiter = Arc::new(limiter);

        let cache = Arc::new(MemoryDishCache::new());
        let vision = MockVision::with_reply(vision_reply);
        let search = MockImageSearch::with_candidates(vec![ImageCandidate {
            link: "https://img.example/dish.jpg".to_string(),
            thumbnail: Some("https://img.example/dish_t.jpg".to_string()),
        }]);
        let generation = MockGeneration::with_reply("bright fresh herbs");

        let extractor = VisionExtractor::new(
            Some(vision.clone() as Arc<dyn MenuVisionBackend>),
            None,
            limiter.clone(),
            events.clone(),
        );
        let resolver = Arc::new(ImageResolver::new(
            cache.clone(),
            Some(search.clone() as Arc<dyn ImageSearchBackend>),
            limiter.clone(),
            events.clone(),
        ));
        let describer = Arc::new(DescriptionGenerator::new(
            Some(generation.clone() as Arc<dyn GenerationBackend>),
            cache,
            limiter,
            events.clone(),
        ));

        Fixture {
            analyzer: MenuAnalyzer::new(extractor, resolver, describer, events),
            search,
            generation,
            vision,
        }
    }

    const TWO_DISH_MENU: &str = r#"{"is_menu": true, "dishes": [
        {"name": "Margherita Pizza", "menu_description": null},
        {"name": "Caesar Salad", "menu_description": "romaine, parmesan"}
    ]}"#;

    #[tokio::test]
    async fn test_analyze_enriches_every_dish() {
        let f = fixture(TWO_DISH_MENU, None);

        let analysis = f.analyzer.analyze(&png_bytes()).await.unwrap();
        assert!(analysis.is_menu);
        assert!(!analysis.image_quota_exceeded);
        assert_eq!(analysis.dishes.len(), 2);
        // Positional order matches extraction order
        assert_eq!(analysis.dishes[0].name, "Margherita Pizza");
        assert_eq!(analysis.dishes[1].name, "Caesar Salad");
        for dish in &analysis.dishes {
            assert_eq!(dish.description, "bright fresh herbs");
            assert_eq!(dish.image_url.as_deref(), Some("https://img.example/dish.jpg"));
        }
        assert_eq!(
            analysis.dishes[1].menu_description.as_deref(),
            Some("romaine, parmesan")
        );
    }

    #[tokio::test]
    async fn test_second_analyze_served_from_cache() {
        let f = fixture(TWO_DISH_MENU, None);

        f.analyzer.analyze(&png_bytes()).await.unwrap();
        let search_calls = f.search.call_count();
        let gen_calls = f.generation.recorded_prompts().await.len();
        assert_eq!(search_calls, 2);
        assert_eq!(gen_calls, 2);

        let again = f.analyzer.analyze(&png_bytes()).await.unwrap();
        assert_eq!(again.dishes.len(), 2);
        // Image and description lookups were fully cache-served
        assert_eq!(f.search.call_count(), search_calls);
        assert_eq!(f.generation.recorded_prompts().await.len(), gen_calls);
        // The vision extraction itself is per-request
        assert_eq!(f.vision.call_count(), 2);
    }

    #[tokio::test]
    async fn test_non_menu_short_circuits_enrichment() {
        let f = fixture(r#"{"is_menu": false, "dishes": []}"#, None);

        let analysis = f.analyzer.analyze(&png_bytes()).await.unwrap();
        assert!(!analysis.is_menu);
        assert!(analysis.dishes.is_empty());
        assert_eq!(f.search.call_count(), 0);
        assert!(f.generation.recorded_prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_daily_image_quota_sets_flag() {
        let f = fixture(
            TWO_DISH_MENU,
            Some(ApiQuota {
                per_minute: 100,
                per_day: 1,
            }),
        );

        let analysis = f.analyzer.analyze(&png_bytes()).await.unwrap();
        // One dish resolved, the second hit the daily limit
        assert!(analysis.image_quota_exceeded);
        assert_eq!(analysis.dishes.len(), 2);
        // Descriptions still present for every dish
        assert!(analysis.dishes.iter().all(|d| !d.description.is_empty()));
    }

    #[tokio::test]
    async fn test_unsupported_image_propagates() {
        let f = fixture(TWO_DISH_MENU, None);
        let err = f.analyzer.analyze(b"not an image").await.unwrap_err();
        assert!(matches!(err, menulens_core::Error::UnsupportedImage(_)));
    }
}
