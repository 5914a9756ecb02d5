//! Server event types and event bus for observability.
//!
//! Components receive an [`EventBus`] handle instead of calling a free
//! logging function; tests subscribe and assert on emitted events rather
//! than string-matching log output. Downstream consumers (telemetry,
//! dashboards) subscribe independently.

use serde::Serialize;
use tokio::sync::broadcast;

/// Unified server event type.
///
/// Serialized as JSON with a `type` tag field, e.g.
/// `{"type":"RateLimitHit","api":"image-search","scope":"day"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// An external API call passed the quota gate and was issued.
    ApiCall {
        api: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        success: bool,
    },
    /// A quota check denied an external call.
    RateLimitHit {
        api: String,
        /// Which counter tripped: "minute" or "day".
        scope: String,
    },
    /// Daily usage crossed an alerting threshold (informational only).
    QuotaThreshold {
        api: String,
        /// Fraction of the daily limit consumed, 0.0–1.0.
        usage: f64,
        daily_limit: u64,
    },
    /// A menu photo finished the analysis pipeline.
    DishAnalyzed {
        dish_count: usize,
        is_menu: bool,
        cache_hits: usize,
    },
}

impl ServerEvent {
    /// Returns the event type name (used for filtering by consumers).
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::ApiCall { .. } => "ApiCall",
            ServerEvent::RateLimitHit { .. } => "RateLimitHit",
            ServerEvent::QuotaThreshold { .. } => "QuotaThreshold",
            ServerEvent::DishAnalyzed { .. } => "DishAnalyzed",
        }
    }
}

/// Broadcast-based event bus for distributing server events.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer size. Slow
/// receivers that fall behind receive a `Lagged` error and miss events —
/// freshness matters more than completeness for observability streams.
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers.
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub fn emit(&self, event: ServerEvent) {
        tracing::debug!(
            event_type = event.event_type(),
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_subscribe() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();

        bus.emit(ServerEvent::RateLimitHit {
            api: "image-search".to_string(),
            scope: "day".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ServerEvent::RateLimitHit { .. }));
        assert_eq!(event.event_type(), "RateLimitHit");
    }

    #[tokio::test]
    async fn test_no_subscribers_ok() {
        let bus = EventBus::new(32);
        // Should not panic with no subscribers
        bus.emit(ServerEvent::ApiCall {
            api: "vision".to_string(),
            duration_ms: Some(120),
            success: true,
        });
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(32);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(ServerEvent::DishAnalyzed {
            dish_count: 4,
            is_menu: true,
            cache_hits: 2,
        });

        assert!(matches!(
            rx1.recv().await.unwrap(),
            ServerEvent::DishAnalyzed { dish_count: 4, .. }
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            ServerEvent::DishAnalyzed { dish_count: 4, .. }
        ));
    }

    #[test]
    fn test_json_serialization() {
        let event = ServerEvent::QuotaThreshold {
            api: "vision".to_string(),
            usage: 0.85,
            daily_limit: 500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"QuotaThreshold"#));
        assert!(json.contains(r#""daily_limit":500"#));
    }

    #[test]
    fn test_api_call_skips_absent_duration() {
        let event = ServerEvent::ApiCall {
            api: "ocr".to_string(),
            duration_ms: None,
            success: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("duration_ms"));
    }
}
