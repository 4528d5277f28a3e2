//! Post API endpoints
//!
//! Public reads, owner-only writes, and the personalized feed.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{PaginatedPostsResponse, PostResponse};
use crate::models::{CreatePostInput, UpdatePostInput};
use crate::services::PostError;

pub(crate) fn map_post_error(error: PostError) -> ApiError {
    match error {
        PostError::Validation { field, message } => ApiError::field_validation(field, message),
        PostError::NotFound => ApiError::not_found("Post not found"),
        PostError::Forbidden => ApiError::forbidden(error.to_string()),
        PostError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /api/v1/posts - list posts, newest first
pub async fn list_posts(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let (posts, total) = state
        .post_service
        .list(pagination.page, pagination.page_size)
        .await
        .map_err(map_post_error)?;

    Ok(Json(PaginatedPostsResponse::new(
        posts,
        total,
        pagination.page,
        pagination.page_size,
    )))
}

/// GET /api/v1/posts/{id} - retrieve a post
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .get(id)
        .await
        .map_err(map_post_error)?
        .ok_or_else(|| ApiError::not_found(format!("Post not found: {}", id)))?;

    Ok(Json(PostResponse::from(post)))
}

/// POST /api/v1/posts - create a post authored by the caller
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_service
        .create(&user.0, body)
        .await
        .map_err(map_post_error)?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// PUT/PATCH /api/v1/posts/{id} - update a post (owner only)
pub async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .post_service
        .update(id, &user.0, body)
        .await
        .map_err(map_post_error)?;

    Ok(Json(PostResponse::from(post)))
}

/// DELETE /api/v1/posts/{id} - delete a post (owner only)
pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .post_service
        .delete(id, &user.0)
        .await
        .map_err(map_post_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/feed - posts by followees of the caller, newest first
pub async fn feed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<PaginatedPostsResponse>, ApiError> {
    let (posts, total) = state
        .post_service
        .feed(&user.0, pagination.page, pagination.page_size)
        .await
        .map_err(map_post_error)?;

    Ok(Json(PaginatedPostsResponse::new(
        posts,
        total,
        pagination.page,
        pagination.page_size,
    )))
}
