//! Token repositories
//!
//! Database operations for auth tokens and password reset tokens.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AuthToken, PasswordResetToken};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Auth token repository trait
#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    /// Store a new token
    async fn create(&self, token: &AuthToken) -> Result<AuthToken>;

    /// Look up a token by its value
    async fn get_by_id(&self, id: &str) -> Result<Option<AuthToken>>;

    /// Delete a token (logout)
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all expired tokens, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// Password reset token repository trait
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Store a new reset token
    async fn create(&self, token: &PasswordResetToken) -> Result<PasswordResetToken>;

    /// Look up a reset token by its value
    async fn get_by_id(&self, id: &str) -> Result<Option<PasswordResetToken>>;

    /// Mark a reset token as redeemed
    async fn mark_used(&self, id: &str) -> Result<()>;
}

/// SQLx-based auth token repository
pub struct SqlxAuthTokenRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthTokenRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthTokenRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthTokenRepository for SqlxAuthTokenRepository {
    async fn create(&self, token: &AuthToken) -> Result<AuthToken> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_token_sqlite(self.pool.as_sqlite().unwrap(), token).await
            }
            DatabaseDriver::Mysql => create_token_mysql(self.pool.as_mysql().unwrap(), token).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AuthToken>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_token_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_token_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_token_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_token_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn delete_expired(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_expired_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => delete_expired_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

/// SQLx-based password reset token repository
pub struct SqlxPasswordResetRepository {
    pool: DynDatabasePool,
}

impl SqlxPasswordResetRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PasswordResetRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PasswordResetRepository for SqlxPasswordResetRepository {
    async fn create(&self, token: &PasswordResetToken) -> Result<PasswordResetToken> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_reset_sqlite(self.pool.as_sqlite().unwrap(), token).await
            }
            DatabaseDriver::Mysql => create_reset_mysql(self.pool.as_mysql().unwrap(), token).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<PasswordResetToken>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_reset_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_reset_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn mark_used(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => mark_used_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => mark_used_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_token_sqlite(pool: &SqlitePool, token: &AuthToken) -> Result<AuthToken> {
    sqlx::query(
        "INSERT INTO auth_tokens (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&token.id)
    .bind(token.user_id)
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create auth token")?;

    Ok(token.clone())
}

async fn get_token_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        "SELECT id, user_id, expires_at, created_at FROM auth_tokens WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get auth token")?;

    Ok(row.map(|row| AuthToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

async fn delete_token_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete auth token")?;

    Ok(())
}

async fn delete_expired_sqlite(pool: &SqlitePool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < CURRENT_TIMESTAMP")
        .execute(pool)
        .await
        .context("Failed to delete expired tokens")?;

    Ok(result.rows_affected() as i64)
}

async fn create_reset_sqlite(
    pool: &SqlitePool,
    token: &PasswordResetToken,
) -> Result<PasswordResetToken> {
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (id, user_id, expires_at, used, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&token.id)
    .bind(token.user_id)
    .bind(token.expires_at)
    .bind(token.used)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create reset token")?;

    Ok(token.clone())
}

async fn get_reset_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<PasswordResetToken>> {
    let row = sqlx::query(
        "SELECT id, user_id, expires_at, used, created_at FROM password_reset_tokens WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get reset token")?;

    Ok(row.map(|row| PasswordResetToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        used: row.get("used"),
        created_at: row.get("created_at"),
    }))
}

async fn mark_used_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to mark reset token used")?;

    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_token_mysql(pool: &MySqlPool, token: &AuthToken) -> Result<AuthToken> {
    sqlx::query(
        "INSERT INTO auth_tokens (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&token.id)
    .bind(token.user_id)
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create auth token")?;

    Ok(token.clone())
}

async fn get_token_mysql(pool: &MySqlPool, id: &str) -> Result<Option<AuthToken>> {
    let row = sqlx::query(
        "SELECT id, user_id, expires_at, created_at FROM auth_tokens WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get auth token")?;

    Ok(row.map(|row| AuthToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

async fn delete_token_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete auth token")?;

    Ok(())
}

async fn delete_expired_mysql(pool: &MySqlPool) -> Result<i64> {
    let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < CURRENT_TIMESTAMP")
        .execute(pool)
        .await
        .context("Failed to delete expired tokens")?;

    Ok(result.rows_affected() as i64)
}

async fn create_reset_mysql(
    pool: &MySqlPool,
    token: &PasswordResetToken,
) -> Result<PasswordResetToken> {
    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (id, user_id, expires_at, used, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&token.id)
    .bind(token.user_id)
    .bind(token.expires_at)
    .bind(token.used)
    .bind(token.created_at)
    .execute(pool)
    .await
    .context("Failed to create reset token")?;

    Ok(token.clone())
}

async fn get_reset_mysql(pool: &MySqlPool, id: &str) -> Result<Option<PasswordResetToken>> {
    let row = sqlx::query(
        "SELECT id, user_id, expires_at, used, created_at FROM password_reset_tokens WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get reset token")?;

    Ok(row.map(|row| PasswordResetToken {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        used: row.get("used"),
        created_at: row.get("created_at"),
    }))
}

async fn mark_used_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to mark reset token used")?;

    Ok(())
}
