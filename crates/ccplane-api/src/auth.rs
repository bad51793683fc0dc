use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ccplane_access::UserContext;
use serde::Deserialize;

use crate::state::AppState;

/// Identity the plane trusts without re-validating: the IdP itself is out
/// of scope (spec.md §1), so an upstream gateway is expected to have
/// already authenticated the caller and to set this header on every
/// forwarded request.
#[derive(Debug, Deserialize)]
struct TrustedIdentity {
    user_id: String,
    #[serde(default)]
    team_ids: Vec<String>,
    manager_id: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Requires a valid `Authorization: Bearer <token>` header identifying the
/// calling service, then — if present — decodes `X-User-Context` into a
/// `UserContext` request extension for handlers that need to evaluate
/// access on behalf of a human caller. Missing or malformed bearer auth is
/// always a 401; a missing `X-User-Context` is not (service-to-service
/// calls like the reaper's own refresh trigger carry no user identity).
pub async fn require_bearer_token<S: Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == state.auth_token.as_str() => {}
        _ => return (StatusCode::UNAUTHORIZED, "Unauthorized\n").into_response(),
    }

    if let Some(raw) = request.headers().get("X-User-Context").and_then(|v| v.to_str().ok()) {
        match serde_json::from_str::<TrustedIdentity>(raw) {
            Ok(identity) => {
                request.extensions_mut().insert(UserContext {
                    user_id: ccplane_domain::UserId::new(identity.user_id),
                    team_ids: identity.team_ids.into_iter().map(ccplane_domain::TeamId::new).collect(),
                    manager_id: identity.manager_id.map(ccplane_domain::UserId::new),
                    roles: identity.roles.iter().map(|r| ccplane_domain::Role::from_str(r)).collect(),
                });
            }
            Err(_) => return (StatusCode::BAD_REQUEST, "malformed X-User-Context\n").into_response(),
        }
    }

    next.run(request).await
}
