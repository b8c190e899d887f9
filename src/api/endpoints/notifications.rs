//! The patient's merged notification list.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, NotificationListResponse};
use crate::models::enums::{NotificationType, Priority, RelatedEventType};
use crate::models::NewRemoteNotification;
use crate::notifications::DeleteOutcome;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// `GET /api/patients/:user_id/notifications?q=`: newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let session = ctx.session(&user_id)?;
    let center = session.center();
    let summary = center.summary();

    let listed = match query.q.as_deref() {
        Some(term) => center.search(term),
        None => summary.notifications.clone(),
    };

    Ok(Json(NotificationListResponse::new(
        &summary,
        listed,
        ctx.services.clock.now(),
    )))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub outcome: DeleteOutcome,
}

/// `DELETE /api/patients/:user_id/notifications/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let session = ctx.session(&user_id)?;
    let outcome = session.center().delete_notification(&id).await?;
    Ok(Json(DeleteResponse { id, outcome }))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// `DELETE /api/patients/:user_id/notifications`: mark all as read.
pub async fn clear_all(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let session = ctx.session(&user_id)?;
    let cleared = session.center().clear_all().await?;
    Ok(Json(ClearResponse { cleared }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NotificationType,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub related_event_id: Option<String>,
    #[serde(default)]
    pub related_event_type: Option<RelatedEventType>,
}

fn default_kind() -> NotificationType {
    NotificationType::Info
}

fn default_priority() -> Priority {
    Priority::Medium
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// `POST /api/patients/:user_id/notifications`: insert into the remote feed.
///
/// Does not require a live session; subscribers are notified if one exists.
pub async fn create(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let id = create_remote(
        &ctx,
        NewRemoteNotification {
            user_id,
            title: req.title,
            message: req.message,
            kind: req.kind,
            priority: req.priority,
            action_url: req.action_url,
            related_event_id: req.related_event_id,
            related_event_type: req.related_event_type,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Run a feed insert on the blocking pool.
pub(crate) async fn create_remote(
    ctx: &ApiContext,
    new: NewRemoteNotification,
) -> Result<String, ApiError> {
    let feed = ctx.services.feed.clone();
    let id = tokio::task::spawn_blocking(move || feed.create(new))
        .await
        .map_err(|e| ApiError::Internal(format!("feed task failed: {e}")))??;
    Ok(id)
}
