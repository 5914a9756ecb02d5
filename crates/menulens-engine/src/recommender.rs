//! Preference-based dish recommendations.
//!
//! The one engine component that surfaces typed errors instead of
//! degrading: a wrong or hallucinated recommendation is worse than none.
//! The collaborator's reply is validated against the original candidate
//! list; anything it invented is dropped, and dish fields are re-attached
//! from the originals rather than trusted from the echo.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, warn};

use menulens_core::{
    defaults, Dish, Error, EventBus, GenerationBackend, PreferenceProfile, Recommendation,
    Result, ServerEvent,
};
use menulens_quota::Decision;

const SYSTEM_RECOMMENDER: &str = "You are a restaurant dish recommender. You MUST \
recommend only dishes from the provided candidate list, copied verbatim. You MUST \
NOT recommend any dish that could contain a declared allergen. You SHOULD avoid \
dishes containing disliked ingredients. Return exactly 3 ranked entries as a JSON \
array and nothing else: [{\"name\": string, \"score\": number 0-100, \"reason\": \
string}]. Each reason must cite the specific preference it satisfies.";

/// Preference-driven recommendation engine.
pub struct RecommendationEngine {
    generation: Option<Arc<dyn GenerationBackend>>,
    limiter: Arc<menulens_quota::RateLimiter>,
    events: Arc<EventBus>,
}

impl RecommendationEngine {
    pub fn new(
        generation: Option<Arc<dyn GenerationBackend>>,
        limiter: Arc<menulens_quota::RateLimiter>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            generation,
            limiter,
            events,
        }
    }

    /// Rank up to 3 dishes from `dishes` against the stored preferences.
    ///
    /// Zero surviving recommendations after validation is `Ok(vec![])` —
    /// "no match found", not an error.
    pub async fn recommend(
        &self,
        dishes: &[Dish],
        profile: &PreferenceProfile,
    ) -> Result<Vec<Recommendation>> {
        if dishes.is_empty() {
            return Err(Error::InvalidInput("no dishes supplied".to_string()));
        }
        let backend = self.generation.as_ref().ok_or_else(|| {
            Error::Config("generation backend not configured for recommendations".to_string())
        })?;

        match self
            .limiter
            .check_and_increment(defaults::API_GENERATION)
            .await
        {
            Decision::Allowed => {}
            Decision::Denied(scope) => {
                return Err(Error::RateLimited(format!(
                    "recommendation quota exceeded ({:?} scope)",
                    scope
                )));
            }
        }

        let prompt = build_prompt(dishes, profile);
        let start = Instant::now();
        let result = backend.generate_with_system(SYSTEM_RECOMMENDER, &prompt).await;
        self.events.emit(ServerEvent::ApiCall {
            api: defaults::API_GENERATION.to_string(),
            duration_ms: Some(start.elapsed().as_millis() as u64),
            success: result.is_ok(),
        });

        let raw = result.map_err(|e| Error::Recommendation(e.to_string()))?;
        let parsed = parse_recommendations(&raw).ok_or_else(|| {
            Error::Recommendation("unparseable recommendation reply".to_string())
        })?;

        let validated = validate_recommendations(parsed, dishes);
        debug!(
            subsystem = "engine",
            component = "recommender",
            op = "recommend",
            dish_count = dishes.len(),
            result_count = validated.len(),
            "Recommendations validated"
        );
        Ok(validated)
    }
}

/// Assemble the user prompt: exact candidate list plus the five preference
/// facets. Allergies carry hard-exclusion wording; disliked ingredients are
/// soft-avoid.
fn build_prompt(dishes: &[Dish], profile: &PreferenceProfile) -> String {
    format!(
        "Candidate dishes (recommend ONLY from this list):\n{}\n\n{}",
        candidate_text(dishes),
        preference_text(profile)
    )
}

fn candidate_text(dishes: &[Dish]) -> String {
    dishes
        .iter()
        .enumerate()
        .map(|(i, dish)| {
            if dish.description.is_empty() {
                format!("{}. {}", i + 1, dish.name)
            } else {
                format!("{}. {} - {}", i + 1, dish.name, dish.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preference_text(profile: &PreferenceProfile) -> String {
    fn facet(label: &str, tags: &[String]) -> String {
        if tags.is_empty() {
            format!("{}: none stated", label)
        } else {
            format!("{}: {}", label, tags.join(", "))
        }
    }

    [
        facet("Dietary requirements", &profile.dietary),
        facet("Preferred cuisines", &profile.cuisines),
        facet("Flavor preferences", &profile.flavors),
        facet(
            "ALLERGIES (hard exclusion - never recommend a dish containing these)",
            &profile.allergies,
        ),
        facet(
            "Disliked ingredients (soft avoid - skip when alternatives exist)",
            &profile.disliked_ingredients,
        ),
    ]
    .join("\n")
}

#[derive(Deserialize)]
struct RawRecommendation {
    name: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    reason: String,
}

/// Parse the collaborator's reply defensively: find the JSON array inside
/// whatever fencing or prose surrounds it.
fn parse_recommendations(raw: &str) -> Option<Vec<RawRecommendation>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Case-insensitively match each returned name against the candidate list,
/// dropping hallucinations and re-attaching dish fields from the originals.
/// Truncates to at most 3 survivors.
fn validate_recommendations(raw: Vec<RawRecommendation>, dishes: &[Dish]) -> Vec<Recommendation> {
    let mut validated = Vec::new();
    for rec in raw {
        let wanted = rec.name.trim().to_lowercase();
        let Some(dish) = dishes
            .iter()
            .find(|d| d.name.trim().to_lowercase() == wanted)
        else {
            warn!(
                subsystem = "engine",
                component = "recommender",
                name = %rec.name,
                "Dropping recommendation not present in the candidate list"
            );
            continue;
        };
        validated.push(Recommendation {
            name: dish.name.clone(),
            description: dish.description.clone(),
            image_url: dish.image_url.clone(),
            score: rec.score.clamp(0.0, 100.0).round() as u8,
            reason: rec.reason.clone(),
        });
        if validated.len() == 3 {
            break;
        }
    }
    validated
}
