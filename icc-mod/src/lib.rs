//! icc-mod library - moderation service
//!
//! Report intake, review queue, case detail, actions, assignment, audit log
//! and dashboard counters for the ICC community, over one SQLite store.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod moderation;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// SHA-256 of the static admin key; `None` disables key authentication
    pub key_digest: Option<[u8; 32]>,
    /// Accept identity headers set by an upstream gateway
    pub trust_gateway_headers: bool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, admin_key: Option<&str>, trust_gateway_headers: bool) -> Self {
        Self {
            db,
            key_digest: admin_key.map(icc_common::api::digest_admin_key),
            trust_gateway_headers,
        }
    }
}

/// Build application router
///
/// Admin routes require an admin identity; `/health` and report submission
/// are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    // Protected routes (require an admin identity)
    let admin = Router::new()
        .route("/api/admin/moderation/queue", get(api::get_queue))
        .route("/api/admin/moderation/case", get(api::get_case))
        .route("/api/admin/moderation/action", post(api::post_action))
        .route("/api/admin/moderation/assign", post(api::post_assign))
        .route("/api/admin/moderation/report", post(api::post_report_status))
        .route("/api/admin/moderation/stats", get(api::get_stats))
        .route("/api/admin/audit", get(api::get_audit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/api/community/reports", post(api::post_report))
        .merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
