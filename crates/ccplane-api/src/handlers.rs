use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use ccplane_ingest::HeartbeatPayload;
use ccplane_resilience::Deadline;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::{AppState, Store};

// ── Health ────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Dependency-reachability + per-cache hit-ratio report (spec.md §4.5
/// "Metrics", §6 "Health endpoint reporting per-cache status and
/// dependency reachability").
pub async fn ready<S: Store>(State(state): State<AppState<S>>) -> Result<Json<Value>, ApiError> {
    let drift_reachable = state.drift.statistics().await.is_ok();

    fn cache_report<V>(cache: &ccplane_cache::TwoLevelCache<V>) -> Value {
        let m = cache.metrics();
        json!({
            "l1_hit_ratio": m.l1_hit_ratio(),
            "l2_hit_ratio": m.l2_hit_ratio(),
            "overall_hit_ratio": m.overall_hit_ratio(),
            "error_rate": m.error_rate(),
        })
    }

    let body = json!({
        "store_reachable": drift_reachable,
        "caches": {
            "expected-hash": cache_report(&state.cache.expected_hash),
            "service-resolution": cache_report(&state.cache.service_resolution),
            "permissions": cache_report(&state.cache.permissions),
            "csot-fallback": cache_report(&state.cache.csot_fallback),
            "idp-fallback": cache_report(&state.cache.idp_fallback),
        },
    });

    if drift_reachable {
        Ok(Json(body))
    } else {
        Err(ApiError { status: StatusCode::SERVICE_UNAVAILABLE, message: body.to_string() })
    }
}

// ── Heartbeat ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HeartbeatResponse {
    success: bool,
    #[serde(rename = "driftDetected")]
    drift_detected: bool,
    message: String,
}

/// `POST heartbeat` (spec.md §6). Response shape is fixed by the wire
/// contract: `success` reflects persistence, not drift outcome.
pub async fn post_heartbeat<S: Store>(
    State(state): State<AppState<S>>,
    Json(payload): Json<HeartbeatPayload>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let deadline = Deadline::after(state.default_deadline);
    let result = state.orchestrator.ingest(payload, deadline).await?;
    Ok(Json(HeartbeatResponse {
        success: true,
        drift_detected: result.drift_detected,
        message: "accepted".to_string(),
    }))
}

// ── Admin refresh ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub destination: String,
}

/// `POST refresh?destination=<pattern>` — operator-triggered refresh,
/// bypassing the ingest pipeline entirely (spec.md §6, §4.6).
pub async fn post_refresh<S: Store>(
    State(state): State<AppState<S>>,
    Query(q): Query<RefreshQuery>,
) -> Result<StatusCode, ApiError> {
    let bus = state.refresh_bus.clone();
    let destination = q.destination;
    state
        .refresh_breaker
        .call(move || async move { bus.publish(&destination).await })
        .await?;
    Ok(StatusCode::ACCEPTED)
}

// ── Cache clear ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CacheClearQuery {
    #[serde(rename = "cacheName")]
    pub cache_name: Option<String>,
}

/// `POST cache/clear?cacheName=<name?>` — invalidates one named cache, or
/// every named cache when `cacheName` is omitted (spec.md §6).
pub async fn post_cache_clear<S: Store>(
    State(state): State<AppState<S>>,
    Query(q): Query<CacheClearQuery>,
) -> StatusCode {
    state.cache.clear(q.cache_name.as_deref()).await;
    StatusCode::OK
}

// ── Drift statistics ──────────────────────────────────────────────────────

/// `GET drift/statistics` — `{total, unresolved, byStatus, bySeverity,
/// affectedInstances}` (spec.md §6).
pub async fn get_drift_statistics<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Value>, ApiError> {
    let stats = state.drift.statistics().await.map_err(ApiError::from)?;
    Ok(Json(json!({
        "total": stats.total,
        "unresolved": stats.unresolved,
        "byStatus": stats.by_status,
        "bySeverity": stats.by_severity,
        "affectedInstances": stats.affected_instances,
    })))
}
