//! # menulens-db
//!
//! PostgreSQL database layer for menulens.
//!
//! This crate provides:
//! - Connection pool management
//! - Dish cache repository (normalized-key upserts, read-time expiry)
//! - Preference profile repository (one row per device)
//!
//! ## Example
//!
//! ```rust,ignore
//! use menulens_db::Database;
//! use menulens_core::normalize_dish_name;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/menulens").await?;
//!     let key = normalize_dish_name("Pad Thai  $12.99");
//!     let cached = db.dish_cache.get_fresh(&key).await?;
//!     println!("cache hit: {}", cached.is_some());
//!     Ok(())
//! }
//! ```

pub mod dish_cache;
pub mod pool;
pub mod preferences;

// Re-export core types
pub use menulens_core::*;

pub use dish_cache::PgDishCacheRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use preferences::PgPreferenceRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Dish cache repository.
    pub dish_cache: PgDishCacheRepository,
    /// Preference profile repository.
    pub preferences: PgPreferenceRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            dish_cache: PgDishCacheRepository::new(pool.clone()),
            preferences: PgPreferenceRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            dish_cache: PgDishCacheRepository::new(self.pool.clone()),
            preferences: PgPreferenceRepository::new(self.pool.clone()),
        }
    }
}
