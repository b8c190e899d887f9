//! Platform alert permission.
//!
//! Reminders are only shown once the platform grants permission. The UI
//! asks on first use through `POST /api/alerts/permission`.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::enums::AlertPermission;

#[derive(Serialize)]
pub struct PermissionResponse {
    pub permission: AlertPermission,
}

/// `GET /api/alerts/permission`
pub async fn permission(
    State(ctx): State<ApiContext>,
) -> Result<Json<PermissionResponse>, ApiError> {
    Ok(Json(PermissionResponse {
        permission: ctx.services.alerts.permission(),
    }))
}

/// `POST /api/alerts/permission`: prompt the platform if still undecided.
pub async fn request_permission(
    State(ctx): State<ApiContext>,
) -> Result<Json<PermissionResponse>, ApiError> {
    Ok(Json(PermissionResponse {
        permission: ctx.services.alerts.request_permission(),
    }))
}
