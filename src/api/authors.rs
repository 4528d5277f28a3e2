//! Author API endpoints
//!
//! Catalog CRUD for authors. The detail view nests the author's books.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::books::map_catalog_error;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthorDetailResponse, AuthorResponse};
use crate::models::{CreateAuthorInput, UpdateAuthorInput};

/// Query parameters of the author listing
#[derive(Debug, Default, Deserialize)]
pub struct AuthorListParams {
    /// Name fragment filter
    pub name: Option<String>,
}

/// GET /api/v1/authors - list authors
pub async fn list_authors(
    State(state): State<AppState>,
    Query(params): Query<AuthorListParams>,
) -> Result<Json<Vec<AuthorResponse>>, ApiError> {
    let authors = state
        .catalog_service
        .list_authors(params.name.as_deref())
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(authors.into_iter().map(AuthorResponse::from).collect()))
}

/// GET /api/v1/authors/{id} - author detail with nested books
pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AuthorDetailResponse>, ApiError> {
    let (author, books) = state
        .catalog_service
        .get_author_with_books(id)
        .await
        .map_err(map_catalog_error)?
        .ok_or_else(|| ApiError::not_found(format!("Author not found: {}", id)))?;

    Ok(Json(AuthorDetailResponse::new(author, books)))
}

/// POST /api/v1/authors - create an author
pub async fn create_author(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateAuthorInput>,
) -> Result<impl IntoResponse, ApiError> {
    let author = state
        .catalog_service
        .create_author(body)
        .await
        .map_err(map_catalog_error)?;

    Ok((StatusCode::CREATED, Json(AuthorResponse::from(author))))
}

/// PUT/PATCH /api/v1/authors/{id} - update an author
pub async fn update_author(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAuthorInput>,
) -> Result<Json<AuthorResponse>, ApiError> {
    let author = state
        .catalog_service
        .update_author(id, body)
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(AuthorResponse::from(author)))
}

/// DELETE /api/v1/authors/{id} - delete an author (books cascade)
pub async fn delete_author(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog_service
        .delete_author(id)
        .await
        .map_err(map_catalog_error)?;

    Ok(StatusCode::NO_CONTENT)
}
