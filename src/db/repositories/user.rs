//! User repository
//!
//! Database operations for users and their 1:1 profiles.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for account data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! User creation inserts the user row and its profile row in one
//! transaction, so a user without a profile can never be observed.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Profile, User, UserRole, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user together with its profile row (one transaction)
    async fn create_with_profile(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user (posts, comments, follows, tokens cascade)
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// List users with pagination, newest first
    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64)>;

    /// Get the profile of a user
    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>>;

    /// Record the stored avatar path for a user
    async fn set_avatar(&self, user_id: i64, avatar: &str) -> Result<Profile>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_with_profile(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_with_profile_sqlite(self.pool.as_sqlite().unwrap(), user).await
            }
            DatabaseDriver::Mysql => {
                create_with_profile_mysql(self.pool.as_mysql().unwrap(), user).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_username_sqlite(self.pool.as_sqlite().unwrap(), username).await
            }
            DatabaseDriver::Mysql => {
                get_by_username_mysql(self.pool.as_mysql().unwrap(), username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => get_by_email_mysql(self.pool.as_mysql().unwrap(), email).await,
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), page, per_page).await
            }
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), page, per_page).await,
        }
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_profile_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => get_profile_mysql(self.pool.as_mysql().unwrap(), user_id).await,
        }
    }

    async fn set_avatar(&self, user_id: i64, avatar: &str) -> Result<Profile> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_avatar_sqlite(self.pool.as_sqlite().unwrap(), user_id, avatar).await
            }
            DatabaseDriver::Mysql => {
                set_avatar_mysql(self.pool.as_mysql().unwrap(), user_id, avatar).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_with_profile_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();
    let status_str = user.status.to_string();

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, bio, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(&role_str)
    .bind(&status_str)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_rowid();

    sqlx::query("INSERT INTO profiles (user_id, updated_at) VALUES (?, ?)")
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create profile")?;

    tx.commit().await.context("Failed to commit user creation")?;

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        bio: user.bio.clone(),
        role: user.role,
        status: user.status,
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn update_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();
    let status_str = user.status.to_string();

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, password_hash = ?, bio = ?, role = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(&role_str)
    .bind(&status_str)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_by_id_sqlite(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

async fn count_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_sqlite(pool: &SqlitePool, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
    let offset = (page - 1) * per_page;

    let rows = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_sqlite(&row)?);
    }

    let total = count_sqlite(pool).await?;

    Ok((users, total))
}

async fn get_profile_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query("SELECT user_id, avatar, updated_at FROM profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get profile")?;

    Ok(row.map(|row| Profile {
        user_id: row.get("user_id"),
        avatar: row.get("avatar"),
        updated_at: row.get("updated_at"),
    }))
}

async fn set_avatar_sqlite(pool: &SqlitePool, user_id: i64, avatar: &str) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query("UPDATE profiles SET avatar = ?, updated_at = ? WHERE user_id = ?")
        .bind(avatar)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to set avatar")?;

    get_profile_sqlite(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found for user {}", user_id))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    let status_str: String = row.get("status");
    let status = UserStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        bio: row.get("bio"),
        role,
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_with_profile_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();
    let status_str = user.status.to_string();

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, bio, role, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(&role_str)
    .bind(&status_str)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create user")?;

    let id = result.last_insert_id() as i64;

    sqlx::query("INSERT INTO profiles (user_id, updated_at) VALUES (?, ?)")
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("Failed to create profile")?;

    tx.commit().await.context("Failed to commit user creation")?;

    Ok(User {
        id,
        username: user.username.clone(),
        email: user.email.clone(),
        password_hash: user.password_hash.clone(),
        bio: user.bio.clone(),
        role: user.role,
        status: user.status,
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by username")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn update_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let role_str = user.role.to_string();
    let status_str = user.status.to_string();

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, password_hash = ?, bio = ?, role = ?, status = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.bio)
    .bind(&role_str)
    .bind(&status_str)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_by_id_mysql(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete user")?;

    Ok(())
}

async fn count_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

async fn list_mysql(pool: &MySqlPool, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
    let offset = (page - 1) * per_page;

    let rows = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, bio, role, status, created_at, updated_at
        FROM users
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row_to_user_mysql(&row)?);
    }

    let total = count_mysql(pool).await?;

    Ok((users, total))
}

async fn get_profile_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<Profile>> {
    let row = sqlx::query("SELECT user_id, avatar, updated_at FROM profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get profile")?;

    Ok(row.map(|row| Profile {
        user_id: row.get("user_id"),
        avatar: row.get("avatar"),
        updated_at: row.get("updated_at"),
    }))
}

async fn set_avatar_mysql(pool: &MySqlPool, user_id: i64, avatar: &str) -> Result<Profile> {
    let now = Utc::now();

    sqlx::query("UPDATE profiles SET avatar = ?, updated_at = ? WHERE user_id = ?")
        .bind(avatar)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to set avatar")?;

    get_profile_mysql(pool, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Profile not found for user {}", user_id))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    let status_str: String = row.get("status");
    let status = UserStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        bio: row.get("bio"),
        role,
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
