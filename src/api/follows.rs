//! Follow API endpoints
//!
//! - POST /api/v1/accounts/follow/{id}
//! - POST /api/v1/accounts/unfollow/{id}

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::FollowError;

fn map_follow_error(error: FollowError) -> ApiError {
    match error {
        FollowError::TargetNotFound => ApiError::not_found("User not found"),
        FollowError::SelfFollow
        | FollowError::AlreadyFollowing
        | FollowError::NotFollowing => ApiError::validation_error(error.to_string()),
        FollowError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// POST /api/v1/accounts/follow/{id} - follow a user
pub async fn follow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .follow_service
        .follow(&user.0, id)
        .await
        .map_err(map_follow_error)?;

    Ok(Json(serde_json::json!({ "message": "Now following" })))
}

/// POST /api/v1/accounts/unfollow/{id} - unfollow a user
pub async fn unfollow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .follow_service
        .unfollow(&user.0, id)
        .await
        .map_err(map_follow_error)?;

    Ok(Json(serde_json::json!({ "message": "No longer following" })))
}
