//! Authentication and account API endpoints
//!
//! - POST /api/v1/auth/register                - registration (user + token)
//! - POST /api/v1/auth/login                   - login (user + token)
//! - POST /api/v1/api-token-auth               - token-only login
//! - POST /api/v1/auth/logout                  - invalidate the token
//! - GET  /api/v1/auth/me                      - current user + profile
//! - PUT  /api/v1/auth/profile                 - edit profile fields
//! - PUT  /api/v1/auth/password                - change password
//! - POST /api/v1/auth/profile/avatar          - upload + resize avatar
//! - POST /api/v1/auth/password-reset          - request a reset token
//! - POST /api/v1/auth/password-reset/confirm  - redeem a reset token

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthResponse, ProfileResponse, UserResponse};
use crate::services::account::{LoginInput, RegisterInput, UpdateProfileInput};
use crate::services::{process_avatar, AccountError};

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

/// Request body for the DRF-style token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenAuthRequest {
    pub username: String,
    pub password: String,
}

/// Response of the DRF-style token endpoint
#[derive(Debug, Serialize)]
pub struct TokenAuthResponse {
    pub token: String,
}

/// Request body for profile edits
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

/// Request body for a password change
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Request body for starting a password reset
#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Request body for redeeming a password reset token
#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

pub(crate) fn map_account_error(error: AccountError) -> ApiError {
    match error {
        AccountError::Validation { field, message } => ApiError::field_validation(field, message),
        AccountError::Conflict(message) => ApiError::conflict(message),
        AccountError::Authentication(message) => ApiError::unauthorized(message),
        AccountError::UserNotFound => ApiError::not_found("User not found"),
        AccountError::InvalidResetToken => {
            ApiError::validation_error("Invalid or expired reset token")
        }
        AccountError::Internal(e) => ApiError::internal_error(e.to_string()),
    }
}

/// POST /api/v1/auth/register - register a new account
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .account_service
        .register(RegisterInput {
            username: body.username,
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(map_account_error)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token: token.id,
        }),
    ))
}

/// POST /api/v1/auth/login - login with credentials
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, token) = state
        .account_service
        .login(LoginInput {
            username_or_email: body.username_or_email,
            password: body.password,
        })
        .await
        .map_err(map_account_error)?;

    Ok(Json(AuthResponse {
        user: user.into(),
        token: token.id,
    }))
}

/// POST /api/v1/api-token-auth - credentials in, bare token out
pub async fn api_token_auth(
    State(state): State<AppState>,
    Json(body): Json<TokenAuthRequest>,
) -> Result<Json<TokenAuthResponse>, ApiError> {
    let (_user, token) = state
        .account_service
        .login(LoginInput {
            username_or_email: body.username,
            password: body.password,
        })
        .await
        .map_err(map_account_error)?;

    Ok(Json(TokenAuthResponse { token: token.id }))
}

/// POST /api/v1/auth/logout - invalidate the presented token
pub async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: axum::http::HeaderMap,
) -> Result<StatusCode, ApiError> {
    // The middleware already validated the header shape
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Token ").or_else(|| v.strip_prefix("Bearer ")))
        .unwrap_or_default()
        .trim()
        .to_string();

    state
        .account_service
        .logout(&token)
        .await
        .map_err(map_account_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me - current user with profile and follow counts
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    profile_response(&state, user.0).await.map(Json)
}

/// PUT /api/v1/auth/profile - edit username/email/bio
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let updated = state
        .account_service
        .update_profile(
            &user.0,
            UpdateProfileInput {
                username: body.username,
                email: body.email,
                bio: body.bio,
            },
        )
        .await
        .map_err(map_account_error)?;

    profile_response(&state, updated).await.map(Json)
}

/// PUT /api/v1/auth/password - change password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .account_service
        .change_password(&user.0, &body.current_password, &body.new_password)
        .await
        .map_err(map_account_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/profile/avatar - upload an avatar
///
/// Accepts multipart/form-data with a single image field named "avatar".
/// The image is bounded to 300x300 (aspect preserved) before storage.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let config = &state.upload_config;

    fs::create_dir_all(&config.path)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create upload dir: {}", e)))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "avatar" && name != "file" {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::field_validation(
                "avatar",
                format!(
                    "Invalid file type: {}. Allowed types: {:?}",
                    content_type, config.allowed_types
                ),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to read file: {}", e)))?;

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::field_validation(
                "avatar",
                format!(
                    "File too large. Maximum size: {} bytes",
                    config.max_file_size
                ),
            ));
        }

        let processed =
            process_avatar(&data).map_err(|e| ApiError::field_validation("avatar", e.to_string()))?;

        let filename = format!("{}.{}", Uuid::new_v4(), processed.extension);
        let file_path = config.path.join(&filename);

        fs::write(&file_path, &processed.data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

        let public_path = format!("/uploads/{}", filename);
        state
            .account_service
            .set_avatar(user.0.id, &public_path)
            .await
            .map_err(map_account_error)?;

        return profile_response(&state, user.0).await.map(Json);
    }

    Err(ApiError::field_validation("avatar", "No file provided"))
}

/// POST /api/v1/auth/password-reset - request a reset token
///
/// Always answers 200 with the same message so the endpoint does not
/// reveal which emails have accounts.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some((user, token)) = state
        .account_service
        .request_password_reset(&body.email)
        .await
        .map_err(map_account_error)?
    {
        if state.mailer.is_configured() {
            if let Err(e) = state.mailer.send_password_reset(&user.email, &token.id).await {
                tracing::error!("Failed to send password reset mail: {}", e);
            }
        } else {
            tracing::warn!(
                "Password reset requested for user {} but SMTP is not configured",
                user.id
            );
        }
    }

    Ok(Json(serde_json::json!({
        "message": "If that email has an account, a reset message is on its way"
    })))
}

/// POST /api/v1/auth/password-reset/confirm - redeem a reset token
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetConfirmRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .account_service
        .confirm_password_reset(&body.token, &body.new_password)
        .await
        .map_err(map_account_error)?;

    Ok(Json(serde_json::json!({
        "message": "Password has been reset"
    })))
}

async fn profile_response(
    state: &AppState,
    user: crate::models::User,
) -> Result<ProfileResponse, ApiError> {
    let profile = state
        .account_service
        .get_profile(user.id)
        .await
        .map_err(map_account_error)?;

    let (following, followers) = state
        .follow_service
        .counts(user.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(ProfileResponse {
        user: UserResponse::from(user),
        avatar: profile.and_then(|p| p.avatar),
        following,
        followers,
    })
}
