//! Counter store backends for quota enforcement.
//!
//! The limiter's correctness rests on the store's `increment` being atomic:
//! concurrent callers each observe a distinct post-increment value, so the
//! compare step can never jointly over-admit. A plain get-then-set would not
//! give that guarantee.
//!
//! ## Configuration (Redis store)
//!
//! Environment variables:
//! - `REDIS_ENABLED`: Set to "false" to disable (default: true)
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use menulens_core::{Error, Result};

/// Key-value counter store with atomic increment and per-key expiry.
///
/// Reachable from all server instances when backed by Redis; the in-memory
/// implementation serves tests and Redis-less development.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter and return the post-increment value.
    ///
    /// When the increment creates the key (value becomes 1), its expiry is
    /// set to `ttl` so stale buckets self-clean.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64>;

    /// Decrement a counter (rollback of a just-made increment).
    async fn decrement(&self, key: &str) -> Result<()>;

    /// Read the current counter value (0 when absent or expired).
    async fn get(&self, key: &str) -> Result<u64>;
}

// =============================================================================
// REDIS
// =============================================================================

/// Redis-backed counter store shared across server instances.
#[derive(Clone)]
pub struct RedisCounterStore {
    inner: Arc<RedisCounterStoreInner>,
}

struct RedisCounterStoreInner {
    /// Redis connection manager (None if disabled or unreachable).
    connection: RwLock<Option<ConnectionManager>>,
}

impl RedisCounterStore {
    /// Create a new counter store from environment configuration.
    ///
    /// Reads `REDIS_ENABLED` (default: true) and `REDIS_URL` (default:
    /// redis://localhost:6379). Connection failure degrades to a
    /// disconnected store — the limiter fails open rather than blocking
    /// the product.
    pub async fn from_env() -> Self {
        let enabled = std::env::var("REDIS_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let connection = if enabled {
            match redis::Client::open(redis_url.as_str()) {
                Ok(client) => match ConnectionManager::new(client).await {
                    Ok(conn) => {
                        info!(
                            subsystem = "quota",
                            component = "store",
                            "Redis counter store connected"
                        );
                        Some(conn)
                    }
                    Err(e) => {
                        warn!("Failed to connect to Redis, quota enforcement degraded: {}", e);
                        None
                    }
                },
                Err(e) => {
                    warn!("Invalid Redis URL, quota enforcement degraded: {}", e);
                    None
                }
            }
        } else {
            info!("Redis counter store disabled via REDIS_ENABLED=false");
            None
        };

        Self {
            inner: Arc::new(RedisCounterStoreInner {
                connection: RwLock::new(connection),
            }),
        }
    }

    /// Create a disconnected store (for testing fail-open behavior).
    pub fn disconnected() -> Self {
        Self {
            inner: Arc::new(RedisCounterStoreInner {
                connection: RwLock::new(None),
            }),
        }
    }

    /// Check if the store is connected.
    pub async fn is_connected(&self) -> bool {
        self.inner.connection.read().await.is_some()
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        let mut conn_guard = self.inner.connection.write().await;
        let conn = conn_guard
            .as_mut()
            .ok_or_else(|| Error::Internal("counter store not connected".to_string()))?;

        let value: u64 = conn
            .incr(key, 1u64)
            .await
            .map_err(|e| Error::Internal(format!("Redis INCR error: {}", e)))?;

        if value == 1 {
            let _: std::result::Result<(), _> =
                conn.expire(key, ttl.as_secs() as i64).await.map_err(|e| {
                    warn!("Redis EXPIRE error on {}: {}", key, e);
                    e
                });
        }

        debug!(
            subsystem = "quota",
            component = "store",
            op = "increment",
            key,
            value,
            "Counter incremented"
        );
        Ok(value)
    }

    async fn decrement(&self, key: &str) -> Result<()> {
        let mut conn_guard = self.inner.connection.write().await;
        let conn = conn_guard
            .as_mut()
            .ok_or_else(|| Error::Internal("counter store not connected".to_string()))?;

        let _: u64 = conn
            .decr(key, 1u64)
            .await
            .map_err(|e| Error::Internal(format!("Redis DECR error: {}", e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<u64> {
        let mut conn_guard = self.inner.connection.write().await;
        let conn = conn_guard
            .as_mut()
            .ok_or_else(|| Error::Internal("counter store not connected".to_string()))?;

        let value: Option<u64> = conn
            .get(key)
            .await
            .map_err(|e| Error::Internal(format!("Redis GET error: {}", e)))?;
        Ok(value.unwrap_or(0))
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Process-local counter store for tests and single-instance development.
///
/// Expiry is honored lazily at access time.
#[derive(Clone, Default)]
pub struct MemoryCounterStore {
    counters: Arc<Mutex<HashMap<String, (u64, Instant)>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();
        let entry = counters.entry(key.to_string()).or_insert((0, now + ttl));
        if entry.1 <= now {
            *entry = (0, now + ttl);
        }
        entry.0 += 1;
        Ok(entry.0)
    }

    async fn decrement(&self, key: &str) -> Result<()> {
        let mut counters = self.counters.lock().await;
        if let Some(entry) = counters.get_mut(key) {
            entry.0 = entry.0.saturating_sub(1);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<u64> {
        let counters = self.counters.lock().await;
        Ok(match counters.get(key) {
            Some((value, expiry)) if *expiry > Instant::now() => *value,
            _ => 0,
        })
    }
}

/// A store that always errors — exercises the limiter's fail-open path.
#[derive(Clone, Default)]
pub struct UnreachableCounterStore;

#[async_trait]
impl CounterStore for UnreachableCounterStore {
    async fn increment(&self, _key: &str, _ttl: Duration) -> Result<u64> {
        Err(Error::Internal("counter store unreachable".to_string()))
    }

    async fn decrement(&self, _key: &str) -> Result<()> {
        Err(Error::Internal("counter store unreachable".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<u64> {
        Err(Error::Internal("counter store unreachable".to_string()))
    }
}
