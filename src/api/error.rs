//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::notifications::{FeedError, NotifyError};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No notification session for patient {0}")]
    NoSession(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NoSession(user_id) => (
                StatusCode::NOT_FOUND,
                "NO_SESSION",
                format!("No notification session for patient {user_id}"),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail.clone()),
            ApiError::FeedUnavailable(detail) => {
                tracing::warn!(detail, "Remote feed unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "FEED_UNAVAILABLE",
                    "Notification feed is unavailable, try again later".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Unavailable(detail) => ApiError::FeedUnavailable(detail),
            FeedError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<NotifyError> for ApiError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Stopped(user_id) => ApiError::NoSession(user_id),
            NotifyError::NotAPatient(role) => {
                ApiError::Forbidden(format!("{role} accounts have no notification feed"))
            }
            NotifyError::Feed(e) => e.into(),
            NotifyError::Dismissal(e) => ApiError::Internal(e.to_string()),
            NotifyError::Encoding(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn no_session_returns_404() {
        let response = ApiError::NoSession("p1".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "NO_SESSION");
    }

    #[tokio::test]
    async fn bad_request_returns_400() {
        let response = ApiError::BadRequest("title must not be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("disk I/O error".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_of(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn feed_unavailable_maps_to_503() {
        let api_err: ApiError = FeedError::Unavailable("timeout".into()).into();
        let response = api_err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "FEED_UNAVAILABLE");
    }

    #[tokio::test]
    async fn doctor_role_is_forbidden() {
        let api_err: ApiError = NotifyError::NotAPatient("doctor").into();
        assert_eq!(api_err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn stopped_session_maps_to_no_session() {
        let api_err: ApiError = NotifyError::Stopped("p1".into()).into();
        assert!(matches!(api_err, ApiError::NoSession(ref id) if id == "p1"));
    }
}
