//! Comment API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::CommentResponse;
use crate::models::{CreateCommentInput, UpdateCommentInput};
use crate::services::CommentError;

fn map_comment_error(error: CommentError) -> ApiError {
    match error {
        CommentError::Validation { field, message } => ApiError::field_validation(field, message),
        CommentError::NotFound => ApiError::not_found("Comment not found"),
        CommentError::Forbidden => ApiError::forbidden(error.to_string()),
        CommentError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// Query parameters of the comment listing
#[derive(Debug, Default, Deserialize)]
pub struct CommentListParams {
    /// Restrict to one post
    pub post: Option<i64>,
}

/// GET /api/v1/comments - list comments, optionally for one post
pub async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<CommentListParams>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let comments = state
        .comment_service
        .list(params.post)
        .await
        .map_err(map_comment_error)?;

    Ok(Json(
        comments.into_iter().map(CommentResponse::from).collect(),
    ))
}

/// GET /api/v1/comments/{id} - retrieve a comment
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .comment_service
        .get(id)
        .await
        .map_err(map_comment_error)?
        .ok_or_else(|| ApiError::not_found(format!("Comment not found: {}", id)))?;

    Ok(Json(CommentResponse::from(comment)))
}

/// POST /api/v1/comments - comment on a post
pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comment_service
        .create(&user.0, body)
        .await
        .map_err(map_comment_error)?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// PUT/PATCH /api/v1/comments/{id} - update a comment (owner only)
pub async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCommentInput>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .comment_service
        .update(id, &user.0, body)
        .await
        .map_err(map_comment_error)?;

    Ok(Json(CommentResponse::from(comment)))
}

/// DELETE /api/v1/comments/{id} - delete a comment (owner only)
pub async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .comment_service
        .delete(id, &user.0)
        .await
        .map_err(map_comment_error)?;

    Ok(StatusCode::NO_CONTENT)
}
