//! Preference profile repository — one row per device identity.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use menulens_core::{Error, PreferenceProfile, Result, UpsertPreferencesRequest};

/// PostgreSQL preference profile repository.
#[derive(Clone)]
pub struct PgPreferenceRepository {
    pool: Pool<Postgres>,
}

impl PgPreferenceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Upsert the profile for a device: update when a row exists for the
    /// device id, insert otherwise. Only the device's own submissions reach
    /// this path.
    pub async fn upsert(
        &self,
        device_id: &str,
        req: &UpsertPreferencesRequest,
    ) -> Result<PreferenceProfile> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO preference_profile
                (device_id, dietary, cuisines, allergies, flavors,
                 disliked_ingredients, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             ON CONFLICT (device_id) DO UPDATE SET
                dietary = EXCLUDED.dietary,
                cuisines = EXCLUDED.cuisines,
                allergies = EXCLUDED.allergies,
                flavors = EXCLUDED.flavors,
                disliked_ingredients = EXCLUDED.disliked_ingredients,
                updated_at = EXCLUDED.updated_at
             RETURNING device_id, dietary, cuisines, allergies, flavors,
                       disliked_ingredients, created_at, updated_at",
        )
        .bind(device_id)
        .bind(&req.dietary)
        .bind(&req.cuisines)
        .bind(&req.allergies)
        .bind(&req.flavors)
        .bind(&req.disliked_ingredients)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::parse_row(&row))
    }

    /// Fetch the profile for a device id, if one has been saved.
    pub async fn get(&self, device_id: &str) -> Result<Option<PreferenceProfile>> {
        let row = sqlx::query(
            "SELECT device_id, dietary, cuisines, allergies, flavors,
                    disliked_ingredients, created_at, updated_at
             FROM preference_profile WHERE device_id = $1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    /// Delete a device's profile (explicit clearing by the device).
    pub async fn delete(&self, device_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM preference_profile WHERE device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> PreferenceProfile {
        PreferenceProfile {
            device_id: row.get("device_id"),
            dietary: row.get("dietary"),
            cuisines: row.get("cuisines"),
            allergies: row.get("allergies"),
            flavors: row.get("flavors"),
            disliked_ingredients: row.get("disliked_ingredients"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}
