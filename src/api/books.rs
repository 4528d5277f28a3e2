//! Book API endpoints
//!
//! Catalog CRUD for books. Reads are public; writes require
//! authentication but no ownership: any authenticated user may edit any
//! book.
//!
//! - GET    /api/v1/books          - list with filters/search/ordering
//! - POST   /api/v1/books          - create (auth)
//! - GET    /api/v1/books/{id}     - retrieve
//! - PUT    /api/v1/books/{id}     - full update (auth, title required)
//! - PATCH  /api/v1/books/{id}     - partial update (auth)
//! - DELETE /api/v1/books/{id}     - delete (auth)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::BookResponse;
use crate::db::repositories::BookQuery;
use crate::models::{CreateBookInput, UpdateBookInput};
use crate::services::CatalogError;

/// Query parameters of the book listing, mapped 1:1 onto `BookQuery`
#[derive(Debug, Default, Deserialize)]
pub struct BookListParams {
    pub title: Option<String>,
    #[serde(rename = "title__icontains")]
    pub title_icontains: Option<String>,
    pub publication_year: Option<i32>,
    #[serde(rename = "publication_year__gte")]
    pub publication_year_gte: Option<i32>,
    #[serde(rename = "publication_year__lte")]
    pub publication_year_lte: Option<i32>,
    pub author: Option<i64>,
    #[serde(rename = "author__name")]
    pub author_name: Option<String>,
    #[serde(rename = "author__name__iexact")]
    pub author_name_iexact: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl BookListParams {
    fn into_query(self) -> Result<BookQuery, ApiError> {
        let order = match self.ordering {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| ApiError::field_validation("ordering", e))?,
            None => Default::default(),
        };

        Ok(BookQuery {
            title: self.title,
            title_icontains: self.title_icontains,
            publication_year: self.publication_year,
            publication_year_gte: self.publication_year_gte,
            publication_year_lte: self.publication_year_lte,
            author: self.author,
            author_name: self.author_name,
            author_name_iexact: self.author_name_iexact,
            search: self.search,
            order,
        })
    }
}

/// Map catalog service errors onto the API envelope
pub(crate) fn map_catalog_error(error: CatalogError) -> ApiError {
    match error {
        CatalogError::Validation { field, message } => ApiError::field_validation(field, message),
        CatalogError::NotFound(entity) => ApiError::not_found(format!("{} not found", entity)),
        CatalogError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// GET /api/v1/books - list books
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<BookListParams>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let query = params.into_query()?;

    let books = state
        .catalog_service
        .list_books(&query)
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /api/v1/books/{id} - retrieve a book
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state
        .catalog_service
        .get_book(id)
        .await
        .map_err(map_catalog_error)?
        .ok_or_else(|| ApiError::not_found(format!("Book not found: {}", id)))?;

    Ok(Json(BookResponse::from(book)))
}

/// POST /api/v1/books - create a book
pub async fn create_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<CreateBookInput>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state
        .catalog_service
        .create_book(body)
        .await
        .map_err(map_catalog_error)?;

    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// PUT /api/v1/books/{id} - full update; the title must be present
pub async fn replace_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBookInput>,
) -> Result<Json<BookResponse>, ApiError> {
    if body.title.is_none() {
        return Err(ApiError::field_validation("title", "Title is required"));
    }

    let book = state
        .catalog_service
        .update_book(id, body)
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(BookResponse::from(book)))
}

/// PATCH /api/v1/books/{id} - partial update
pub async fn update_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBookInput>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state
        .catalog_service
        .update_book(id, body)
        .await
        .map_err(map_catalog_error)?;

    Ok(Json(BookResponse::from(book)))
}

/// DELETE /api/v1/books/{id} - delete a book
pub async fn delete_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog_service
        .delete_book(id)
        .await
        .map_err(map_catalog_error)?;

    Ok(StatusCode::NO_CONTENT)
}
