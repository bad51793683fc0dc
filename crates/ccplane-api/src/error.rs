use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: msg.into() }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::UNAUTHORIZED, message: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::NOT_FOUND, message: msg.into() }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::CONFLICT, message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: msg.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<ccplane_store::StoreError> for ApiError {
    fn from(e: ccplane_store::StoreError) -> Self {
        use ccplane_store::StoreError::*;
        match e {
            NotFound(_) => ApiError::not_found(e.to_string()),
            AlreadyExists(_) | VersionConflict(_) => ApiError::conflict(e.to_string()),
            Serialization(_) | Internal(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ccplane_ingest::IngestError> for ApiError {
    fn from(e: ccplane_ingest::IngestError) -> Self {
        use ccplane_ingest::IngestError::*;
        match e {
            UnknownService(_) => ApiError::bad_request(e.to_string()),
            DeadlineExceeded => {
                ApiError { status: StatusCode::REQUEST_TIMEOUT, message: e.to_string() }
            }
            Backpressure => {
                ApiError { status: StatusCode::SERVICE_UNAVAILABLE, message: e.to_string() }
            }
            Store(inner) => inner.into(),
        }
    }
}

impl From<ccplane_domain::ControlPlaneError> for ApiError {
    fn from(e: ccplane_domain::ControlPlaneError) -> Self {
        use ccplane_domain::ErrorKind::*;
        let status = match e.kind {
            InvalidInput => StatusCode::BAD_REQUEST,
            Unauthenticated => StatusCode::UNAUTHORIZED,
            Unauthorized => StatusCode::FORBIDDEN,
            NotFound => StatusCode::NOT_FOUND,
            Conflict | AlreadyTerminal => StatusCode::CONFLICT,
            DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError { status, message: e.message }
    }
}
