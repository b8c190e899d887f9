//! Patient session lifecycle.
//!
//! A session starts the first time a patient's records are pushed and
//! lives until it is ended explicitly or the server shuts down.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, NotificationListResponse};
use crate::models::PatientSources;

/// `PUT /api/patients/:user_id/sources`: replace the patient's records.
pub async fn replace_sources(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    Json(sources): Json<PatientSources>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let session = ctx.upsert_session(&user_id, sources)?;
    let summary = session.center().summary();
    let listed = summary.notifications.clone();
    Ok(Json(NotificationListResponse::new(
        &summary,
        listed,
        ctx.services.clock.now(),
    )))
}

/// `DELETE /api/patients/:user_id/session`: sign-out.
pub async fn end(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if ctx.end_session(&user_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NoSession(user_id))
    }
}
