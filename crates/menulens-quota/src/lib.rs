//! # menulens-quota
//!
//! Shared counter store and per-API rate limiting for menulens.
//!
//! This crate guards third-party API spend: every outbound collaborator
//! call passes through [`RateLimiter::check_and_increment`], which enforces
//! sliding-window and calendar-day quotas against a counter store shared by
//! all server instances (Redis), failing open when the store is down.

pub mod limiter;
pub mod store;

pub use limiter::{ApiQuota, ApiUsageStats, Decision, DeniedScope, RateLimiter};
pub use store::{CounterStore, MemoryCounterStore, RedisCounterStore, UnreachableCounterStore};
