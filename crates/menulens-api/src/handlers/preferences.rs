//! Preference profile HTTP handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use menulens_core::{PreferenceProfile, UpsertPreferencesRequest};

use super::DeviceQuery;
use crate::{ApiError, AppState};

/// Upsert the calling device's preference profile.
///
/// # Returns
/// - 201 Created with the stored profile
/// - 400 Bad Request on validation failure or missing deviceId
#[utoipa::path(post, path = "/api/v1/preferences", tag = "Preferences",
    params(("deviceId" = String, Query, description = "Opaque device identity")),
    request_body = UpsertPreferencesRequest,
    responses(
        (status = 201, description = "Profile stored", body = PreferenceProfile),
        (status = 400, description = "Validation failure"),
    ))]
pub async fn upsert_preferences(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
    Json(req): Json<UpsertPreferencesRequest>,
) -> Result<(StatusCode, Json<PreferenceProfile>), ApiError> {
    query.validate()?;
    req.validate()?;

    let profile = state.db.preferences.upsert(&query.device_id, &req).await?;
    info!(
        subsystem = "api",
        component = "preferences",
        op = "upsert",
        device_id = %query.device_id,
        "Preference profile stored"
    );
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Fetch the calling device's preference profile.
///
/// # Returns
/// - 200 OK with the profile
/// - 404 Not Found when the device has not saved preferences yet
#[utoipa::path(get, path = "/api/v1/preferences", tag = "Preferences",
    params(("deviceId" = String, Query, description = "Opaque device identity")),
    responses(
        (status = 200, description = "Stored profile", body = PreferenceProfile),
        (status = 404, description = "No profile for this device"),
    ))]
pub async fn get_preferences(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<PreferenceProfile>, ApiError> {
    query.validate()?;

    let profile = state
        .db
        .preferences
        .get(&query.device_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No preferences saved for this device".to_string())
        })?;
    Ok(Json(profile))
}
