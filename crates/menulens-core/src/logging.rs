//! Structured logging schema and field name constants for menulens.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → enrichment sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "engine", "db", "quota", "providers"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "resolver", "describer", "extractor", "limiter", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "resolve", "extract", "recommend", "check_and_increment"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// External API name a quota decision or call applies to.
pub const API_NAME: &str = "api";

/// Normalized dish cache key being operated on.
pub const DISH_KEY: &str = "dish_key";

/// Opaque device identifier (preference operations).
pub const DEVICE_ID: &str = "device_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of dishes returned by an extraction or pipeline run.
pub const DISH_COUNT: &str = "dish_count";

/// Number of cache hits in a batch operation.
pub const CACHE_HITS: &str = "cache_hits";

/// Byte length of a prompt or response.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Quota fields ──────────────────────────────────────────────────────────

/// Current window usage count.
pub const WINDOW_USAGE: &str = "window_usage";

/// Current daily usage count.
pub const DAILY_USAGE: &str = "daily_usage";

/// Configured daily limit.
pub const DAILY_LIMIT: &str = "daily_limit";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for a collaborator call.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
