//! Account service
//!
//! Business logic for accounts and credentials:
//! - Registration (user + profile in one transaction, first user becomes
//!   admin, token issued immediately)
//! - Login (credentials checked, token issued)
//! - Token resolution for the auth middleware
//! - Profile editing and password change
//! - Password reset (time-limited, single-use emailed token)
//! - User administration (list/update/delete)

use crate::db::repositories::{AuthTokenRepository, PasswordResetRepository, UserRepository};
use crate::models::{AuthToken, PasswordResetToken, Profile, User, UserRole, UserStatus};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default auth token lifetime in days
const DEFAULT_TOKEN_EXPIRATION_DAYS: i64 = 7;

/// Password reset token lifetime in minutes
const RESET_TOKEN_EXPIRATION_MINUTES: i64 = 60;

/// Error types for account operations
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Invalid input; `field` keys the error in the response body
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// Username or email already taken
    #[error("{0}")]
    Conflict(String),

    /// Authentication failed (bad credentials, banned account)
    #[error("{0}")]
    Authentication(String),

    /// Referenced user does not exist
    #[error("User not found")]
    UserNotFound,

    /// Reset token unknown, expired, or already used
    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn validation(field: &'static str, message: impl Into<String>) -> AccountError {
    AccountError::Validation {
        field,
        message: message.into(),
    }
}

/// Input for registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Input for login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

/// Input for profile editing; absent fields keep their value
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

/// Input for the user-administration surface
#[derive(Debug, Clone, Default)]
pub struct AdminUpdateUserInput {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

/// Account service
pub struct AccountService {
    user_repo: Arc<dyn UserRepository>,
    token_repo: Arc<dyn AuthTokenRepository>,
    reset_repo: Arc<dyn PasswordResetRepository>,
    token_expiration_days: i64,
}

impl AccountService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        token_repo: Arc<dyn AuthTokenRepository>,
        reset_repo: Arc<dyn PasswordResetRepository>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            reset_repo,
            token_expiration_days: DEFAULT_TOKEN_EXPIRATION_DAYS,
        }
    }

    /// Override the token lifetime (used by expiry tests)
    pub fn with_token_expiration(mut self, days: i64) -> Self {
        self.token_expiration_days = days;
        self
    }

    /// Register a new account.
    ///
    /// Creates the user row and its profile row in one transaction and
    /// issues the first auth token. The first user in the system gets the
    /// admin role.
    pub async fn register(&self, input: RegisterInput) -> Result<(User, AuthToken), AccountError> {
        self.validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(AccountError::Conflict(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(AccountError::Conflict(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        let role = if count == 0 {
            UserRole::Admin
        } else {
            UserRole::Member
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = self
            .user_repo
            .create_with_profile(&User::new(input.username, input.email, password_hash, role))
            .await
            .context("Failed to create user")?;

        let token = self.issue_token(user.id).await?;

        Ok((user, token))
    }

    /// Login with credentials; issues a fresh token on success.
    pub async fn login(&self, input: LoginInput) -> Result<(User, AuthToken), AccountError> {
        let user = self
            .find_by_username_or_email(&input.username_or_email)
            .await?
            .ok_or_else(|| {
                AccountError::Authentication("Invalid username or password".to_string())
            })?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(AccountError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        if user.is_banned() {
            return Err(AccountError::Authentication(
                "This account has been banned".to_string(),
            ));
        }

        let token = self.issue_token(user.id).await?;

        Ok((user, token))
    }

    /// Logout: delete the presented token.
    pub async fn logout(&self, token_id: &str) -> Result<(), AccountError> {
        self.token_repo
            .delete(token_id)
            .await
            .context("Failed to delete token")?;
        Ok(())
    }

    /// Resolve an auth token to its user.
    ///
    /// Returns `None` for unknown or expired tokens (expired ones are
    /// cleaned up on the spot) and for banned accounts.
    pub async fn resolve_token(&self, token_id: &str) -> Result<Option<User>, AccountError> {
        let token = match self
            .token_repo
            .get_by_id(token_id)
            .await
            .context("Failed to get token")?
        {
            Some(t) => t,
            None => return Ok(None),
        };

        if token.is_expired() {
            let _ = self.token_repo.delete(token_id).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(token.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(|u| !u.is_banned()))
    }

    /// Get a user by id
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, AccountError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?)
    }

    /// Get the profile row of a user
    pub async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, AccountError> {
        Ok(self
            .user_repo
            .get_profile(user_id)
            .await
            .context("Failed to get profile")?)
    }

    /// Record a newly stored avatar path
    pub async fn set_avatar(&self, user_id: i64, avatar: &str) -> Result<Profile, AccountError> {
        Ok(self
            .user_repo
            .set_avatar(user_id, avatar)
            .await
            .context("Failed to set avatar")?)
    }

    /// Edit the caller's own profile fields.
    pub async fn update_profile(
        &self,
        user: &User,
        input: UpdateProfileInput,
    ) -> Result<User, AccountError> {
        let mut updated = user.clone();

        if let Some(username) = input.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(validation("username", "Username cannot be empty"));
            }
            if username != user.username {
                if self
                    .user_repo
                    .get_by_username(&username)
                    .await
                    .context("Failed to check username")?
                    .is_some()
                {
                    return Err(AccountError::Conflict(format!(
                        "Username '{}' is already taken",
                        username
                    )));
                }
                updated.username = username;
            }
        }

        if let Some(email) = input.email {
            let email = email.trim().to_string();
            if !email.contains('@') {
                return Err(validation("email", "Invalid email format"));
            }
            if email != user.email {
                if self
                    .user_repo
                    .get_by_email(&email)
                    .await
                    .context("Failed to check email")?
                    .is_some()
                {
                    return Err(AccountError::Conflict(format!(
                        "Email '{}' is already registered",
                        email
                    )));
                }
                updated.email = email;
            }
        }

        if let Some(bio) = input.bio {
            updated.bio = bio;
        }

        Ok(self
            .user_repo
            .update(&updated)
            .await
            .context("Failed to update user")?)
    }

    /// Change password, verifying the current one first.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(AccountError::Authentication(
                "Current password is incorrect".to_string(),
            ));
        }

        if new_password.is_empty() {
            return Err(validation("password", "Password cannot be empty"));
        }

        let mut updated = user.clone();
        updated.password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update(&updated)
            .await
            .context("Failed to update user")?;

        Ok(())
    }

    /// Start a password reset.
    ///
    /// Returns the user and a fresh time-limited token when the email is
    /// known, `None` otherwise. The caller answers identically in both
    /// cases so the endpoint does not reveal which emails have accounts.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, PasswordResetToken)>, AccountError> {
        let user = match self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to look up email")?
        {
            Some(user) => user,
            None => return Ok(None),
        };

        let now = Utc::now();
        let token = PasswordResetToken {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::minutes(RESET_TOKEN_EXPIRATION_MINUTES),
            used: false,
            created_at: now,
        };

        let token = self
            .reset_repo
            .create(&token)
            .await
            .context("Failed to create reset token")?;

        Ok(Some((user, token)))
    }

    /// Redeem a password reset token.
    pub async fn confirm_password_reset(
        &self,
        token_id: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if new_password.is_empty() {
            return Err(validation("password", "Password cannot be empty"));
        }

        let token = self
            .reset_repo
            .get_by_id(token_id)
            .await
            .context("Failed to get reset token")?
            .ok_or(AccountError::InvalidResetToken)?;

        if !token.is_redeemable() {
            return Err(AccountError::InvalidResetToken);
        }

        let mut user = self
            .user_repo
            .get_by_id(token.user_id)
            .await
            .context("Failed to get user")?
            .ok_or(AccountError::UserNotFound)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;

        self.reset_repo
            .mark_used(token_id)
            .await
            .context("Failed to mark token used")?;

        Ok(())
    }

    /// List users (administration surface)
    pub async fn list_users(
        &self,
        page: i64,
        per_page: i64,
    ) -> Result<(Vec<User>, i64), AccountError> {
        Ok(self
            .user_repo
            .list(page, per_page)
            .await
            .context("Failed to list users")?)
    }

    /// Update role/status of a user (administration surface)
    pub async fn admin_update_user(
        &self,
        id: i64,
        input: AdminUpdateUserInput,
    ) -> Result<User, AccountError> {
        let mut user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(AccountError::UserNotFound)?;

        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(status) = input.status {
            user.status = status;
        }

        Ok(self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?)
    }

    /// Delete a user (administration surface); content cascades.
    pub async fn delete_user(&self, id: i64) -> Result<(), AccountError> {
        if self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .is_none()
        {
            return Err(AccountError::UserNotFound);
        }

        self.user_repo
            .delete(id)
            .await
            .context("Failed to delete user")?;
        Ok(())
    }

    /// Remove expired auth tokens; returns how many were deleted.
    pub async fn cleanup_expired_tokens(&self) -> Result<i64, AccountError> {
        Ok(self
            .token_repo
            .delete_expired()
            .await
            .context("Failed to delete expired tokens")?)
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn validate_register_input(&self, input: &RegisterInput) -> Result<(), AccountError> {
        if input.username.trim().is_empty() {
            return Err(validation("username", "Username cannot be empty"));
        }
        if input.email.trim().is_empty() {
            return Err(validation("email", "Email cannot be empty"));
        }
        if !input.email.contains('@') {
            return Err(validation("email", "Invalid email format"));
        }
        if input.password.is_empty() {
            return Err(validation("password", "Password cannot be empty"));
        }
        Ok(())
    }

    async fn find_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, AccountError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        Ok(self
            .user_repo
            .get_by_email(username_or_email)
            .await
            .context("Failed to get user by email")?)
    }

    async fn issue_token(&self, user_id: i64) -> Result<AuthToken, AccountError> {
        let now = Utc::now();
        let token = AuthToken {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.token_expiration_days),
            created_at: now,
        };

        Ok(self
            .token_repo
            .create(&token)
            .await
            .context("Failed to create token")?)
    }
}


// ============================================================================
// Property-based tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::db::repositories::{
        SqlxAuthTokenRepository, SqlxPasswordResetRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    async fn setup_service() -> AccountService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        AccountService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxAuthTokenRepository::boxed(pool.clone()),
            SqlxPasswordResetRepository::boxed(pool),
        )
    }

    fn unique_suffix() -> u64 {
        TEST_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// For any valid credentials, registering then logging in yields a
        /// token that resolves back to the same user.
        #[test]
        fn property_auth_roundtrip(
            username in "[a-z]{3,10}",
            password in "[a-zA-Z0-9!@#$%^&*]{8,20}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_service().await;
                let suffix = unique_suffix();
                let username = format!("{}_{}", username, suffix);

                let (registered, _token) = service
                    .register(RegisterInput {
                        username: username.clone(),
                        email: format!("{}@example.com", username),
                        password: password.clone(),
                    })
                    .await
                    .expect("Registration should succeed");

                let (_user, token) = service
                    .login(LoginInput {
                        username_or_email: username.clone(),
                        password: password.clone(),
                    })
                    .await
                    .expect("Login should succeed");

                let resolved = service
                    .resolve_token(&token.id)
                    .await
                    .expect("Resolution should not error")
                    .expect("Token should resolve");

                prop_assert_eq!(resolved.id, registered.id);
                prop_assert_eq!(resolved.username, registered.username);
                Ok(())
            });
            result?;
        }

        /// Wrong passwords and unknown usernames are always rejected.
        #[test]
        fn property_invalid_credentials_rejected(
            username in "[a-z]{3,10}",
            correct in "[a-zA-Z0-9]{8,20}",
            wrong in "[a-zA-Z0-9]{8,20}"
        ) {
            prop_assume!(correct != wrong);

            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_service().await;
                let suffix = unique_suffix();
                let username = format!("{}_{}", username, suffix);

                service
                    .register(RegisterInput {
                        username: username.clone(),
                        email: format!("{}@example.com", username),
                        password: correct.clone(),
                    })
                    .await
                    .expect("Registration should succeed");

                let bad_password = service
                    .login(LoginInput {
                        username_or_email: username.clone(),
                        password: wrong.clone(),
                    })
                    .await;
                prop_assert!(matches!(bad_password, Err(AccountError::Authentication(_))));

                let unknown = service
                    .login(LoginInput {
                        username_or_email: format!("ghost_{}", suffix),
                        password: correct.clone(),
                    })
                    .await;
                prop_assert!(matches!(unknown, Err(AccountError::Authentication(_))));
                Ok(())
            });
            result?;
        }
    }
}
