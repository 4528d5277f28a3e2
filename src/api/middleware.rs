//! API middleware
//!
//! - Token authentication (`Authorization: Token <t>`, `Bearer` accepted)
//! - The read/write split on the user-administration surface
//! - The shared `AppState` and `ApiError` envelope

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    AccountService, CatalogService, CommentService, FollowService, Mailer, NotificationService,
    PostService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub account_service: Arc<AccountService>,
    pub catalog_service: Arc<CatalogService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub follow_service: Arc<FollowService>,
    pub notification_service: Arc<NotificationService>,
    pub mailer: Arc<Mailer>,
    pub upload_config: Arc<crate::config::UploadConfig>,
}

/// Authenticated user extracted from request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Validation error keyed by the offending field
    pub fn field_validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_details(
            "VALIDATION_ERROR",
            message.clone(),
            serde_json::json!({ field: message }),
        )
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Extract the bearer credential from the Authorization header.
///
/// The canonical scheme is `Token <value>`; `Bearer <value>` is accepted
/// as an alias.
fn extract_token(parts_headers: &axum::http::HeaderMap) -> Option<String> {
    let auth_header = parts_headers.get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;

    auth_str
        .strip_prefix("Token ")
        .or_else(|| auth_str.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Authentication middleware: resolves the token to a user and stores it
/// in request extensions as an explicit identity value.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .account_service
        .resolve_token(&token)
        .await
        .map_err(|e| ApiError::internal_error(format!("Token resolution failed: {}", e)))?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Read/write split policy for the user-administration surface.
///
/// Safe methods pass for any authenticated caller; unsafe methods
/// require the admin role. Runs inside `require_auth`.
pub async fn require_admin_for_writes(request: Request, next: Next) -> Result<Response, ApiError> {
    let safe = matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    );

    if !safe {
        let user = request
            .extensions()
            .get::<AuthenticatedUser>()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        if !user.0.is_admin() {
            return Err(ApiError::forbidden("Admin privileges required"));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_extract_token_scheme() {
        let headers = headers_with_auth("Token abc-123");
        assert_eq!(extract_token(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn test_extract_bearer_alias() {
        let headers = headers_with_auth("Bearer xyz-456");
        assert_eq!(extract_token(&headers), Some("xyz-456".to_string()));
    }

    #[test]
    fn test_extract_token_missing_header() {
        assert!(extract_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_extract_token_wrong_scheme() {
        let headers = headers_with_auth("Basic dXNlcjpwdw==");
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn test_extract_token_empty_value() {
        let headers = headers_with_auth("Token ");
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn test_api_error_codes() {
        assert_eq!(ApiError::unauthorized("x").error.code, "UNAUTHORIZED");
        assert_eq!(ApiError::forbidden("x").error.code, "FORBIDDEN");
        assert_eq!(ApiError::not_found("x").error.code, "NOT_FOUND");
        assert_eq!(ApiError::validation_error("x").error.code, "VALIDATION_ERROR");
        assert_eq!(ApiError::conflict("x").error.code, "CONFLICT");
    }

    #[test]
    fn test_field_validation_details() {
        let error = ApiError::field_validation("title", "Title is required");
        let details = error.error.details.expect("details");
        assert_eq!(details["title"], "Title is required");
    }
}
