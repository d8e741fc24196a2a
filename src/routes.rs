//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets and propagates X-Request-Id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response span with the request id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← Answers preflights; headers on every response, 429s included
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Identity      │ ← Resolves the bearer token into a Caller
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   API quota      │ ← 429 once `apiCall` is exhausted (bypassed for /health, /ready)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Body limit     │ ← 413 above MAX_REQUEST_BODY_SIZE
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/health`, `/ready`, `/stats`, `/me` - Health, monitoring and caller info
//! - `/messages` - Message board
//! - `/files` - File drop
//! - `/admin/admins` - Admin role management

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Request};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{ApiQuotaLayer, IdentityLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// # Middleware Configuration
///
/// - **API quota**: Enabled unless `API_RATE_LIMIT=false`
/// - **CORS**: Configured from `cors_allowed_origins`
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = build_cors_layer(&config.cors_allowed_origins);

    // =========================================================================
    // Build Router with Routes
    // =========================================================================
    let mut router = Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/stats", get(handlers::stats))
        .route("/me", get(handlers::me))
        // Message board
        .route(
            "/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route(
            "/messages/{id}",
            get(handlers::get_message).delete(handlers::delete_message),
        )
        // File drop
        .route(
            "/files",
            get(handlers::list_files).post(handlers::upload_file),
        )
        .route(
            "/files/{id}",
            get(handlers::download_file).delete(handlers::delete_file),
        )
        // Admin role management
        .route(
            "/admin/admins",
            get(handlers::list_admins).post(handlers::grant_admin),
        )
        .route("/admin/admins/{email}", axum::routing::delete(handlers::revoke_admin));

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    info!(
        max_size_mb = config.max_request_body_size / (1024 * 1024),
        max_upload_bytes = config.max_upload_bytes,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. API quota (if enabled); sees the Caller inserted by the identity layer
    if config.api_rate_limit_enabled {
        info!(
            bypass_paths = ?config.quota_bypass_paths,
            "apiCall quota enabled"
        );
        router = router.layer(ApiQuotaLayer::new(
            state.gate.clone(),
            config.quota_bypass_paths.clone(),
        ));
    } else {
        info!("apiCall quota disabled (API_RATE_LIMIT=false)");
    }

    // 3. Identity
    router = router.layer(IdentityLayer::new(state.identity.clone()));

    // 4. CORS, outside the quota so preflights are free and 429s stay readable
    router = router.layer(cors);

    // 5. Tracing, with the request id in every span
    router = router.layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        },
    ));

    // 6. Request ID - outermost, so every later layer sees it
    router = router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    router.with_state(state)
}

/// Build CORS layer from configuration.
///
/// # Security Note
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production. Specify explicit origins instead.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
