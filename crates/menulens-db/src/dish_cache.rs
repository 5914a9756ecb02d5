//! Dish cache repository — persistent enrichment results keyed by
//! normalized dish name.
//!
//! Expiry is a read-time filter: `get_fresh` treats an expired row as a
//! miss, but nothing proactively deletes rows. Writers refresh expiry on
//! every upsert.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use menulens_core::{DishCache, DishCacheEntry, DishCacheUpsert, Error, Result};

/// PostgreSQL dish cache repository.
#[derive(Clone)]
pub struct PgDishCacheRepository {
    pool: Pool<Postgres>,
}

impl PgDishCacheRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a cache entry regardless of expiry (observability/tests).
    pub async fn get_any(&self, dish_key: &str) -> Result<Option<DishCacheEntry>> {
        let row = sqlx::query(
            "SELECT id, dish_key, display_name, image_urls, thumbnail_url,
                    short_description, metadata, created_at, expires_at
             FROM dish_cache WHERE dish_key = $1",
        )
        .bind(dish_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }

    /// Count rows, expired included (observability).
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM dish_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("n"))
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> DishCacheEntry {
        DishCacheEntry {
            id: row.get("id"),
            dish_key: row.get("dish_key"),
            display_name: row.get("display_name"),
            image_urls: row.get("image_urls"),
            thumbnail_url: row.get("thumbnail_url"),
            short_description: row.get("short_description"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        }
    }
}

#[async_trait]
impl DishCache for PgDishCacheRepository {
    /// Upsert a cache entry for a normalized dish key.
    ///
    /// `None` fields in the upsert leave the stored value untouched, so the
    /// image resolver and the description generator can each write their
    /// half without clobbering the other. Last writer wins per field.
    async fn upsert(&self, dish_key: &str, entry: DishCacheUpsert) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let expires_at = DishCacheEntry::default_expiry(now);

        let row = sqlx::query(
            "INSERT INTO dish_cache
                (id, dish_key, display_name, image_urls, thumbnail_url,
                 short_description, metadata, created_at, expires_at)
             VALUES ($1, $2, $3, COALESCE($4, '{}'), $5, $6, COALESCE($7, '{}'::jsonb), $8, $9)
             ON CONFLICT (dish_key) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                image_urls = COALESCE($4, dish_cache.image_urls),
                thumbnail_url = COALESCE($5, dish_cache.thumbnail_url),
                short_description = COALESCE($6, dish_cache.short_description),
                metadata = COALESCE($7, dish_cache.metadata),
                expires_at = EXCLUDED.expires_at
             RETURNING id",
        )
        .bind(id)
        .bind(dish_key)
        .bind(&entry.display_name)
        .bind(entry.image_urls.as_deref())
        .bind(entry.thumbnail_url.as_deref())
        .bind(entry.short_description.as_deref())
        .bind(entry.metadata.as_ref())
        .bind(now)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }

    /// Get a non-expired cache entry by normalized key.
    ///
    /// An expired row is a miss even though it still exists.
    async fn get_fresh(&self, dish_key: &str) -> Result<Option<DishCacheEntry>> {
        let row = sqlx::query(
            "SELECT id, dish_key, display_name, image_urls, thumbnail_url,
                    short_description, metadata, created_at, expires_at
             FROM dish_cache
             WHERE dish_key = $1 AND expires_at > now()",
        )
        .bind(dish_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }
}
