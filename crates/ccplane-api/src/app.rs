use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::{AppState, Store};

/// Builds the axum surface spec.md §6 exposes: heartbeat ingestion, admin
/// refresh, cache invalidation, drift statistics, and health/readiness.
/// Everything but `/health` requires the bearer token (spec.md §1's "IAM
/// identity provider" is out of scope — the plane trusts a validated
/// caller, mirrored here by a shared service token plus an optional
/// forwarded `X-User-Context`).
pub fn build_app<S: Store>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/heartbeat", post(handlers::post_heartbeat))
        .route("/refresh", post(handlers::post_refresh))
        .route("/cache/clear", post(handlers::post_cache_clear))
        .route("/drift/statistics", get(handlers::get_drift_statistics))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
