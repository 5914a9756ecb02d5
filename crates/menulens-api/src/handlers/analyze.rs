//! Menu photo analysis handler.

use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use menulens_core::{defaults, Dish};

use crate::{ApiError, AppState};

/// Response for a menu analysis run.
///
/// Returned with 200 even when zero dishes were found — the message tells
/// the user what happened.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnalyzeResponse {
    pub dishes: Vec<Dish>,
    pub message: String,
    #[serde(rename = "imageQuotaExceeded")]
    pub image_quota_exceeded: bool,
}

/// Analyze an uploaded menu photo.
///
/// Expects a multipart form with an `image` part. Runs vision extraction
/// plus per-dish enrichment (image + short description).
///
/// # Returns
/// - 200 OK with dishes (possibly empty) and a user-facing message
/// - 400 Bad Request for missing parts or unsupported image encodings
/// - 413 Payload Too Large for oversize uploads (body-limit layer)
/// - 504 Gateway Timeout when analysis exceeds the deadline
#[utoipa::path(post, path = "/api/v1/analyze", tag = "Analysis",
    responses(
        (status = 200, description = "Analysis result", body = AnalyzeResponse),
        (status = 400, description = "Missing image or unsupported encoding"),
        (status = 413, description = "Upload too large"),
        (status = 504, description = "Analysis timed out"),
    ))]
pub async fn analyze_menu(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut image_data: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?;
            image_data = Some(bytes.to_vec());
            break;
        }
    }

    let image_data = image_data
        .ok_or_else(|| ApiError::BadRequest("Missing multipart field 'image'".to_string()))?;
    if image_data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded image is empty".to_string()));
    }

    let analysis = tokio::time::timeout(
        Duration::from_secs(defaults::ANALYZE_TIMEOUT_SECS),
        state.analyzer.analyze(&image_data),
    )
    .await
    .map_err(|_| ApiError::Timeout("Menu analysis timed out, please retry".to_string()))??;

    let message = if !analysis.is_menu {
        "This doesn't look like a menu. Try a clearer photo of a menu.".to_string()
    } else if analysis.dishes.is_empty() {
        "No dishes found on this menu. Try a clearer photo.".to_string()
    } else if analysis.image_quota_exceeded {
        format!(
            "Found {} dishes. Photo lookups are limited today, so some dishes may lack images.",
            analysis.dishes.len()
        )
    } else {
        format!("Found {} dishes.", analysis.dishes.len())
    };

    info!(
        subsystem = "api",
        component = "analyze",
        op = "analyze",
        dish_count = analysis.dishes.len(),
        image_quota_exceeded = analysis.image_quota_exceeded,
        "Analysis request complete"
    );

    Ok(Json(AnalyzeResponse {
        dishes: analysis.dishes,
        message,
        image_quota_exceeded: analysis.image_quota_exceeded,
    }))
}
