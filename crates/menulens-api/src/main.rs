//! menulens-api - HTTP API server for menulens

mod handlers;

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use governor::Quota;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use uuid::Uuid;

use menulens_core::{
    defaults, EventBus, GenerationBackend, ImageSearchBackend, MenuVisionBackend, OcrBackend,
};
use menulens_db::Database;
use menulens_engine::{
    DescriptionGenerator, ImageResolver, MenuAnalyzer, RecommendationEngine, VisionExtractor,
};
use menulens_providers::{CseImageSearch, HttpOcrClient, OllamaGeneration, OllamaMenuVision};
use menulens_quota::{RateLimiter, RedisCounterStore};

use handlers::{
    analyze::analyze_menu,
    dish::dish_detail,
    preferences::{get_preferences, upsert_preferences},
    recommendations::recommend_dishes,
    usage::usage_stats,
};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Inbound (whole-server) rate limiter type — distinct from the per-API
/// outbound quota limiter in `menulens-quota`.
type InboundRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub analyzer: Arc<MenuAnalyzer>,
    pub describer: Arc<DescriptionGenerator>,
    pub recommender: Arc<RecommendationEngine>,
    pub limiter: Arc<RateLimiter>,
    /// Inbound rate limiter (None if disabled).
    pub inbound_limiter: Option<Arc<InboundRateLimiter>>,
}

/// OpenAPI documentation, served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MenuLens API",
        version = "2026.8.1",
        description = "Menu photo analysis with cached enrichment and preference-based dish recommendations"
    ),
    paths(
        handlers::preferences::upsert_preferences,
        handlers::preferences::get_preferences,
        handlers::analyze::analyze_menu,
        handlers::recommendations::recommend_dishes,
        handlers::dish::dish_detail,
        handlers::usage::usage_stats,
    ),
    tags(
        (name = "Preferences", description = "Per-device dietary preference profiles"),
        (name = "Analysis", description = "Menu photo analysis and enrichment"),
        (name = "Recommendations", description = "Preference-based dish ranking"),
        (name = "System", description = "Health and quota observability")
    )
)]
struct ApiDoc;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// =============================================================================
// CORS
// =============================================================================

/// Parse allowed origins from the comma-separated `ALLOWED_ORIGINS` env var.
///
/// Strict origin whitelisting; a wildcard CORS policy would let any website
/// spend this deployment's third-party API quota.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str =
        std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string());

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// INBOUND RATE LIMIT MIDDLEWARE
// =============================================================================

async fn inbound_rate_limit(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: middleware::Next,
) -> axum::response::Response {
    if let Some(limiter) = state.inbound_limiter.as_ref() {
        if limiter.check().is_err() {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": "Too many requests, slow down" })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Internal(menulens_core::Error),
    NotFound(String),
    BadRequest(String),
    RateLimited(String),
    ServiceUnavailable(String),
    Timeout(String),
}

impl From<menulens_core::Error> for ApiError {
    fn from(err: menulens_core::Error) -> Self {
        use menulens_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::PreferencesNotFound(_) => ApiError::BadRequest(
                "No preferences saved for this device yet. Please set preferences first."
                    .to_string(),
            ),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            // Reported verbatim: the one user-actionable input failure.
            err @ Error::UnsupportedImage(_) => ApiError::BadRequest(err.to_string()),
            Error::RateLimited(msg) => ApiError::RateLimited(msg),
            Error::Config(msg) => ApiError::ServiceUnavailable(msg),
            err => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// TELEMETRY MIRROR
// =============================================================================

/// Mirror server events into the structured log at info level.
async fn telemetry_mirror(events: Arc<EventBus>) {
    let mut rx = events.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => {
                info!(
                    subsystem = "api",
                    component = "telemetry",
                    event_type = event.event_type(),
                    payload = %serde_json::to_string(&event).unwrap_or_default(),
                    "Server event"
                );
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "Telemetry mirror lagged behind event bus");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   RUST_LOG    - standard env filter (default: "menulens_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "menulens_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("menulens-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
        None
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/menulens".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    // Inbound rate limiting configuration
    let rate_limit_requests: u64 = std::env::var("RATE_LIMIT_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_REQUESTS);
    let rate_limit_period_secs: u64 = std::env::var("RATE_LIMIT_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::RATE_LIMIT_PERIOD_SECS);
    let rate_limit_enabled: bool = std::env::var("RATE_LIMIT_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Event bus and quota limiter (Redis-backed, shared across instances)
    let events = Arc::new(EventBus::new(defaults::EVENT_BUS_CAPACITY));
    let counter_store = Arc::new(RedisCounterStore::from_env().await);
    let limiter = Arc::new(RateLimiter::new(counter_store, events.clone()));

    // Collaborator clients. Each is optional: a missing configuration
    // degrades that capability instead of refusing to start.
    let vision = OllamaMenuVision::from_env()
        .map(|v| Arc::new(v) as Arc<dyn MenuVisionBackend>);
    let ocr = HttpOcrClient::from_env().map(|o| Arc::new(o) as Arc<dyn OcrBackend>);
    let image_search =
        CseImageSearch::from_env().map(|s| Arc::new(s) as Arc<dyn ImageSearchBackend>);
    let generation: Option<Arc<dyn GenerationBackend>> =
        Some(Arc::new(OllamaGeneration::from_env()));

    info!(
        vision = vision.is_some(),
        ocr = ocr.is_some(),
        image_search = image_search.is_some(),
        generation = generation.is_some(),
        "Collaborator backends configured"
    );

    // Engine wiring
    let dish_cache = Arc::new(db.dish_cache.clone());
    let extractor = VisionExtractor::new(vision, ocr, limiter.clone(), events.clone());
    let resolver = Arc::new(ImageResolver::new(
        dish_cache.clone(),
        image_search,
        limiter.clone(),
        events.clone(),
    ));
    let describer = Arc::new(DescriptionGenerator::new(
        generation.clone(),
        dish_cache,
        limiter.clone(),
        events.clone(),
    ));
    let analyzer = Arc::new(MenuAnalyzer::new(
        extractor,
        resolver,
        describer.clone(),
        events.clone(),
    ));
    let recommender = Arc::new(RecommendationEngine::new(
        generation,
        limiter.clone(),
        events.clone(),
    ));

    // Telemetry mirror
    let tm_events = events.clone();
    tokio::spawn(async move {
        telemetry_mirror(tm_events).await;
    });

    // Inbound rate limiter
    let inbound_limiter = if rate_limit_enabled {
        let quota = Quota::with_period(std::time::Duration::from_secs(rate_limit_period_secs))
            .expect("Rate limit period must be non-zero")
            .allow_burst(
                NonZeroU32::new(rate_limit_requests as u32).expect("Rate limit must be non-zero"),
            );
        Some(Arc::new(governor::RateLimiter::direct(quota)))
    } else {
        None
    };
    info!(
        enabled = rate_limit_enabled,
        requests = rate_limit_requests,
        period_secs = rate_limit_period_secs,
        "Inbound rate limiting configured"
    );

    let state = AppState {
        db,
        analyzer,
        describer,
        recommender,
        limiter,
        inbound_limiter,
    };

    // Build router
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(parse_allowed_origins()))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(openapi_json))
        .route(
            "/api/v1/preferences",
            get(get_preferences).post(upsert_preferences),
        )
        .route("/api/v1/analyze", post(analyze_menu))
        .route("/api/v1/recommendations", post(recommend_dishes))
        .route("/api/v1/dish/detail", post(dish_detail))
        .route("/api/v1/usage", get(usage_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inbound_rate_limit,
        ))
        .layer(RequestBodyLimitLayer::new(defaults::MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
