//! Core data models for menulens.
//!
//! These types are shared across all menulens crates and represent the
//! domain entities: preference profiles, dish cache entries, extracted
//! dishes, and recommendations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// PREFERENCES
// =============================================================================

/// Stored dietary preference profile, one per device.
///
/// The device identity is an opaque client-generated string; the server
/// trusts it as-is (no authentication by design).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PreferenceProfile {
    pub device_id: String,
    /// Dietary tags, e.g. "vegetarian", "vegan", "halal".
    pub dietary: Vec<String>,
    /// Preferred cuisine tags, e.g. "thai", "italian".
    pub cuisines: Vec<String>,
    /// Allergy tags — hard exclusions, never recommended.
    pub allergies: Vec<String>,
    /// Flavor tags, e.g. "spicy", "sweet".
    pub flavors: Vec<String>,
    /// Freeform disliked-ingredient strings — soft-avoid.
    pub disliked_ingredients: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload for a device's preference profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpsertPreferencesRequest {
    #[serde(default)]
    pub dietary: Vec<String>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub flavors: Vec<String>,
    #[serde(default)]
    pub disliked_ingredients: Vec<String>,
}

impl UpsertPreferencesRequest {
    /// Reject payloads that are structurally unusable (every facet empty is
    /// allowed — it means "no restrictions" — but absurdly long tag lists are
    /// not).
    pub fn validate(&self) -> crate::Result<()> {
        let total = self.dietary.len()
            + self.cuisines.len()
            + self.allergies.len()
            + self.flavors.len()
            + self.disliked_ingredients.len();
        if total > 200 {
            return Err(crate::Error::InvalidInput(
                "too many preference tags (max 200)".to_string(),
            ));
        }
        for tag in self
            .dietary
            .iter()
            .chain(&self.cuisines)
            .chain(&self.allergies)
            .chain(&self.flavors)
            .chain(&self.disliked_ingredients)
        {
            if tag.trim().is_empty() {
                return Err(crate::Error::InvalidInput(
                    "preference tags must not be blank".to_string(),
                ));
            }
            if tag.len() > 100 {
                return Err(crate::Error::InvalidInput(
                    "preference tags must be 100 characters or fewer".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// DISH CACHE
// =============================================================================

/// Persistent cache entry for an enriched dish.
///
/// Keyed by the normalized dish name. Expired entries are filtered at read
/// time, not deleted.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DishCacheEntry {
    pub id: Uuid,
    /// Normalized cache key (see [`crate::normalize_dish_name`]).
    pub dish_key: String,
    /// Original display name as extracted from a menu.
    pub display_name: String,
    /// Ordered image URLs: first is primary, rest are fallbacks.
    pub image_urls: Vec<String>,
    /// Thumbnail URL when the search provider offered one.
    pub thumbnail_url: Option<String>,
    pub short_description: Option<String>,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DishCacheEntry {
    /// True when the entry may still be served as a cache hit.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Default expiry for newly written entries.
    pub fn default_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(defaults::DISH_CACHE_TTL_DAYS)
    }
}

/// Partial upsert for a dish cache entry.
///
/// The resolver writes images, the describer writes descriptions; `None`
/// fields leave the stored value untouched so the two writers compose.
#[derive(Debug, Clone, Default)]
pub struct DishCacheUpsert {
    pub display_name: String,
    pub image_urls: Option<Vec<String>>,
    pub thumbnail_url: Option<String>,
    pub short_description: Option<String>,
    pub metadata: Option<JsonValue>,
}

// =============================================================================
// EXTRACTION AND ENRICHMENT
// =============================================================================

/// A dish candidate extracted from a photographed menu, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExtractedDish {
    pub name: String,
    /// The menu's own printed description, when visible to the extractor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_description: Option<String>,
}

/// Result of running the vision extractor over one photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuExtraction {
    pub dishes: Vec<ExtractedDish>,
    /// False when the photo is not a menu at all — a valid, successful result.
    pub is_menu: bool,
}

/// A fully enriched dish, assembled from extraction plus image/description
/// lookups.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Dish {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub all_image_urls: Vec<String>,
    /// The menu's own printed description, carried through for grounding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_description: Option<String>,
}

/// Outcome of the full analyze pipeline for one photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuAnalysis {
    pub dishes: Vec<Dish>,
    pub is_menu: bool,
    /// True when image enrichment was degraded by a daily quota, so the UI
    /// can warn that some dishes may lack photos.
    pub image_quota_exceeded: bool,
}

// =============================================================================
// RECOMMENDATIONS
// =============================================================================

/// A ranked dish recommendation. Derived per request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Recommendation {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Match score in 0–100.
    pub score: u8,
    /// Preference-grounded justification.
    pub reason: String,
}

/// One image-search result candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}
