//! HTTP handlers for the menulens API.

pub mod analyze;
pub mod dish;
pub mod preferences;
pub mod recommendations;
pub mod usage;

use serde::Deserialize;

/// Query carrying the opaque device identity.
///
/// The value is client-generated and trusted as-is — an intentional product
/// decision (no login), not a security boundary.
#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

impl DeviceQuery {
    /// Reject blank identifiers before they reach storage.
    pub fn validate(&self) -> Result<(), crate::ApiError> {
        if self.device_id.trim().is_empty() {
            return Err(crate::ApiError::BadRequest(
                "deviceId must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
