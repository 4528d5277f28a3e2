//! User administration API endpoints
//!
//! This surface carries the read/write split policy: safe methods pass
//! for any authenticated user, unsafe methods require the admin role
//! (enforced by `require_admin_for_writes` in the router).
//!
//! - GET    /api/v1/users        - list users
//! - GET    /api/v1/users/{id}   - retrieve a user
//! - PUT    /api/v1/users/{id}   - change role/status (admin)
//! - DELETE /api/v1/users/{id}   - delete a user (admin)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::auth::map_account_error;
use crate::api::common::AdminPaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::UserResponse;
use crate::models::{UserRole, UserStatus};
use crate::services::account::AdminUpdateUserInput;

/// Paginated user list
#[derive(Debug, Serialize)]
pub struct PaginatedUsersResponse {
    pub users: Vec<UserResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Request body for role/status changes
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub role: Option<String>,
    pub status: Option<String>,
}

/// GET /api/v1/users - list users
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(pagination): Query<AdminPaginationQuery>,
) -> Result<Json<PaginatedUsersResponse>, ApiError> {
    let (users, total) = state
        .account_service
        .list_users(pagination.page, pagination.per_page)
        .await
        .map_err(map_account_error)?;

    Ok(Json(PaginatedUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
        page: pagination.page,
        per_page: pagination.per_page,
    }))
}

/// GET /api/v1/users/{id} - retrieve a user
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .account_service
        .get_user(id)
        .await
        .map_err(map_account_error)?
        .ok_or_else(|| ApiError::not_found(format!("User not found: {}", id)))?;

    Ok(Json(UserResponse::from(user)))
}

/// PUT /api/v1/users/{id} - change role/status (admin only via policy)
pub async fn update_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let role = body
        .role
        .map(|raw| UserRole::from_str(&raw))
        .transpose()
        .map_err(|e| ApiError::field_validation("role", e.to_string()))?;
    let status = body
        .status
        .map(|raw| UserStatus::from_str(&raw))
        .transpose()
        .map_err(|e| ApiError::field_validation("status", e.to_string()))?;

    let updated = state
        .account_service
        .admin_update_user(id, AdminUpdateUserInput { role, status })
        .await
        .map_err(map_account_error)?;

    Ok(Json(UserResponse::from(updated)))
}

/// DELETE /api/v1/users/{id} - delete a user (admin only via policy)
pub async fn delete_user(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .account_service
        .delete_user(id)
        .await
        .map_err(map_account_error)?;

    Ok(StatusCode::NO_CONTENT)
}
