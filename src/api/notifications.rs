//! Notification API endpoints
//!
//! - GET  /api/v1/notifications               - list (unread first)
//! - POST /api/v1/notifications/{id}/read     - mark read
//! - GET  /api/v1/notifications/unread-count  - unread counter

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::NotificationResponse;
use crate::services::NotificationError;

fn map_notification_error(error: NotificationError) -> ApiError {
    match error {
        NotificationError::NotFound => ApiError::not_found("Notification not found"),
        NotificationError::AlreadyRead => ApiError::validation_error("Notification already read"),
        NotificationError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// Response for the unread counter
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

/// GET /api/v1/notifications - list the caller's notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state
        .notification_service
        .list(&user.0)
        .await
        .map_err(map_notification_error)?;

    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

/// POST /api/v1/notifications/{id}/read - mark one notification read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .notification_service
        .mark_read(&user.0, id)
        .await
        .map_err(map_notification_error)?;

    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}

/// GET /api/v1/notifications/unread-count - count unread notifications
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread = state
        .notification_service
        .unread_count(&user.0)
        .await
        .map_err(map_notification_error)?;

    Ok(Json(UnreadCountResponse {
        unread_count: unread,
    }))
}
