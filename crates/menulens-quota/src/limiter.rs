//! Per-API rate limiter over the shared counter store.
//!
//! Guards third-party API spend with two counters per API name: a sliding
//! window bucket (per minute) and a calendar-day bucket (UTC). The check
//! and the increment are one atomic sequence from the caller's view —
//! concurrent callers cannot jointly exceed a limit, because admission is
//! decided on the store's post-increment value and losers roll back.
//!
//! Failure semantics: an unreachable counter store fails OPEN. Product
//! availability is prioritized over strict quota enforcement.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use menulens_core::{defaults, EventBus, ServerEvent};

use crate::store::CounterStore;

/// Per-API call thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ApiQuota {
    pub per_minute: u64,
    pub per_day: u64,
}

/// Which counter denied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeniedScope {
    Minute,
    Day,
}

impl DeniedScope {
    fn as_str(&self) -> &'static str {
        match self {
            DeniedScope::Minute => "minute",
            DeniedScope::Day => "day",
        }
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DeniedScope),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Usage snapshot for one API (observability, not control flow).
#[derive(Debug, Clone, Serialize)]
pub struct ApiUsageStats {
    pub api: String,
    pub window_usage: u64,
    pub window_limit: u64,
    pub daily_usage: u64,
    pub daily_limit: u64,
    pub within_limits: bool,
}

/// Rate limiter for outbound third-party API calls.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    quotas: HashMap<String, ApiQuota>,
    events: Arc<EventBus>,
    window_ms: u64,
}

impl RateLimiter {
    /// Create a limiter with the default per-API quotas.
    pub fn new(store: Arc<dyn CounterStore>, events: Arc<EventBus>) -> Self {
        let mut quotas = HashMap::new();
        quotas.insert(
            defaults::API_VISION.to_string(),
            ApiQuota {
                per_minute: defaults::VISION_PER_MINUTE,
                per_day: defaults::VISION_PER_DAY,
            },
        );
        quotas.insert(
            defaults::API_OCR.to_string(),
            ApiQuota {
                per_minute: defaults::OCR_PER_MINUTE,
                per_day: defaults::OCR_PER_DAY,
            },
        );
        quotas.insert(
            defaults::API_IMAGE_SEARCH.to_string(),
            ApiQuota {
                per_minute: defaults::IMAGE_SEARCH_PER_MINUTE,
                per_day: defaults::IMAGE_SEARCH_PER_DAY,
            },
        );
        quotas.insert(
            defaults::API_GENERATION.to_string(),
            ApiQuota {
                per_minute: defaults::GENERATION_PER_MINUTE,
                per_day: defaults::GENERATION_PER_DAY,
            },
        );

        Self {
            store,
            quotas,
            events,
            window_ms: defaults::QUOTA_WINDOW_MS,
        }
    }

    /// Override or add the quota for one API name.
    pub fn with_quota(mut self, api: &str, quota: ApiQuota) -> Self {
        self.quotas.insert(api.to_string(), quota);
        self
    }

    /// Override the sliding-window length (tests).
    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    fn window_key(&self, api: &str, now: DateTime<Utc>) -> String {
        let window_index = now.timestamp_millis() as u64 / self.window_ms;
        format!("quota:{}:w:{}", api, window_index)
    }

    fn day_key(&self, api: &str, now: DateTime<Utc>) -> String {
        format!("quota:{}:d:{}", api, now.format("%Y%m%d"))
    }

    /// Check both counters for `api` and, when within limits, count the call.
    ///
    /// The only quota entry point callers use. Denials do not consume quota.
    pub async fn check_and_increment(&self, api: &str) -> Decision {
        self.check_and_increment_at(api, Utc::now()).await
    }

    async fn check_and_increment_at(&self, api: &str, now: DateTime<Utc>) -> Decision {
        let Some(quota) = self.quotas.get(api) else {
            // Configuration gap, not a security boundary. Latent bug surface.
            warn!(
                subsystem = "quota",
                component = "limiter",
                api,
                "No quota configured for API, allowing request"
            );
            return Decision::Allowed;
        };

        let window_key = self.window_key(api, now);
        let day_key = self.day_key(api, now);

        // Fast-path reads: a request already at the limit is denied without
        // touching either counter.
        let window_usage = match self.store.get(&window_key).await {
            Ok(v) => v,
            Err(e) => return self.fail_open(api, &e.to_string()),
        };
        if window_usage >= quota.per_minute {
            return self.deny(api, DeniedScope::Minute, window_usage, quota.per_minute);
        }
        let daily_usage = match self.store.get(&day_key).await {
            Ok(v) => v,
            Err(e) => return self.fail_open(api, &e.to_string()),
        };
        if daily_usage >= quota.per_day {
            return self.deny(api, DeniedScope::Day, daily_usage, quota.per_day);
        }

        // Admission is decided on the post-increment value; racing losers
        // roll back, so a bucket never admits more than its limit.
        let window_value = match self
            .store
            .increment(&window_key, Duration::from_millis(self.window_ms))
            .await
        {
            Ok(v) => v,
            Err(e) => return self.fail_open(api, &e.to_string()),
        };
        if window_value > quota.per_minute {
            let _ = self.store.decrement(&window_key).await;
            return self.deny(api, DeniedScope::Minute, window_value, quota.per_minute);
        }

        let day_value = match self
            .store
            .increment(&day_key, Duration::from_secs(defaults::QUOTA_DAY_TTL_SECS))
            .await
        {
            Ok(v) => v,
            Err(e) => return self.fail_open(api, &e.to_string()),
        };
        if day_value > quota.per_day {
            let _ = self.store.decrement(&day_key).await;
            let _ = self.store.decrement(&window_key).await;
            return self.deny(api, DeniedScope::Day, day_value, quota.per_day);
        }

        self.check_thresholds(api, day_value, quota.per_day);

        debug!(
            subsystem = "quota",
            component = "limiter",
            op = "check_and_increment",
            api,
            window_usage = window_value,
            daily_usage = day_value,
            "Request allowed"
        );
        Decision::Allowed
    }

    fn fail_open(&self, api: &str, error: &str) -> Decision {
        warn!(
            subsystem = "quota",
            component = "limiter",
            api,
            error,
            "Counter store unreachable, failing open"
        );
        Decision::Allowed
    }

    fn deny(&self, api: &str, scope: DeniedScope, usage: u64, limit: u64) -> Decision {
        warn!(
            subsystem = "quota",
            component = "limiter",
            api,
            scope = scope.as_str(),
            usage,
            limit,
            "Rate limit hit"
        );
        self.events.emit(ServerEvent::RateLimitHit {
            api: api.to_string(),
            scope: scope.as_str().to_string(),
        });
        Decision::Denied(scope)
    }

    /// Escalating daily-usage warnings at 80% and 90%. Informational only.
    fn check_thresholds(&self, api: &str, daily_usage: u64, daily_limit: u64) {
        let warn_at = (daily_limit as f64 * defaults::QUOTA_WARN_THRESHOLD).ceil() as u64;
        let critical_at = (daily_limit as f64 * defaults::QUOTA_CRITICAL_THRESHOLD).ceil() as u64;

        // Counters advance by one per allowed call, so equality fires exactly
        // once per threshold per day.
        if daily_usage == critical_at {
            warn!(
                subsystem = "quota",
                component = "limiter",
                api,
                daily_usage,
                daily_limit,
                "Daily quota above 90%"
            );
            self.events.emit(ServerEvent::QuotaThreshold {
                api: api.to_string(),
                usage: defaults::QUOTA_CRITICAL_THRESHOLD,
                daily_limit,
            });
        } else if daily_usage == warn_at {
            warn!(
                subsystem = "quota",
                component = "limiter",
                api,
                daily_usage,
                daily_limit,
                "Daily quota above 80%"
            );
            self.events.emit(ServerEvent::QuotaThreshold {
                api: api.to_string(),
                usage: defaults::QUOTA_WARN_THRESHOLD,
                daily_limit,
            });
        }
    }

    /// Usage snapshot per configured API, sorted by API name.
    pub async fn usage_stats(&self) -> Vec<ApiUsageStats> {
        self.usage_stats_at(Utc::now()).await
    }

    async fn usage_stats_at(&self, now: DateTime<Utc>) -> Vec<ApiUsageStats> {
        let mut stats = Vec::with_capacity(self.quotas.len());
        for (api, quota) in &self.quotas {
            let window_usage = self
                .store
                .get(&self.window_key(api, now))
                .await
                .unwrap_or(0);
            let daily_usage = self.store.get(&self.day_key(api, now)).await.unwrap_or(0);
            stats.push(ApiUsageStats {
                api: api.clone(),
                window_usage,
                window_limit: quota.per_minute,
                daily_usage,
                daily_limit: quota.per_day,
                within_limits: window_usage < quota.per_minute && daily_usage < quota.per_day,
            });
        }
        stats.sort_by(|a, b| a.api.cmp(&b.api));
        stats
    }
}
