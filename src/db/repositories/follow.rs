//! Follow repository
//!
//! Database operations for the asymmetric follow graph.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Follow;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Follow repository trait
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Insert a follow edge
    async fn create(&self, follower_id: i64, followed_id: i64) -> Result<Follow>;

    /// Remove a follow edge; returns whether one existed
    async fn delete(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    /// Check whether the edge exists
    async fn exists(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    /// Users that `user_id` follows
    async fn following(&self, user_id: i64) -> Result<Vec<i64>>;

    /// How many users `user_id` follows
    async fn following_count(&self, user_id: i64) -> Result<i64>;

    /// How many users follow `user_id`
    async fn follower_count(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based follow repository implementation
pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn create(&self, follower_id: i64, followed_id: i64) -> Result<Follow> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(self.pool.as_sqlite().unwrap(), follower_id, followed_id).await
            }
            DatabaseDriver::Mysql => {
                create_mysql(self.pool.as_mysql().unwrap(), follower_id, followed_id).await
            }
        }
    }

    async fn delete(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_sqlite(self.pool.as_sqlite().unwrap(), follower_id, followed_id).await
            }
            DatabaseDriver::Mysql => {
                delete_mysql(self.pool.as_mysql().unwrap(), follower_id, followed_id).await
            }
        }
    }

    async fn exists(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                exists_sqlite(self.pool.as_sqlite().unwrap(), follower_id, followed_id).await
            }
            DatabaseDriver::Mysql => {
                exists_mysql(self.pool.as_mysql().unwrap(), follower_id, followed_id).await
            }
        }
    }

    async fn following(&self, user_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => following_sqlite(self.pool.as_sqlite().unwrap(), user_id).await,
            DatabaseDriver::Mysql => following_mysql(self.pool.as_mysql().unwrap(), user_id).await,
        }
    }

    async fn following_count(&self, user_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_sqlite(self.pool.as_sqlite().unwrap(), "follower_id", user_id).await
            }
            DatabaseDriver::Mysql => {
                count_mysql(self.pool.as_mysql().unwrap(), "follower_id", user_id).await
            }
        }
    }

    async fn follower_count(&self, user_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_sqlite(self.pool.as_sqlite().unwrap(), "followed_id", user_id).await
            }
            DatabaseDriver::Mysql => {
                count_mysql(self.pool.as_mysql().unwrap(), "followed_id", user_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<Follow> {
    let now = Utc::now();

    sqlx::query("INSERT INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)")
        .bind(follower_id)
        .bind(followed_id)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create follow")?;

    Ok(Follow {
        follower_id,
        followed_id,
        created_at: now,
    })
}

async fn delete_sqlite(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await
        .context("Failed to delete follow")?;

    Ok(result.rows_affected() > 0)
}

async fn exists_sqlite(pool: &SqlitePool, follower_id: i64, followed_id: i64) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM follows WHERE follower_id = ? AND followed_id = ?",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_one(pool)
    .await
    .context("Failed to check follow")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn following_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT followed_id FROM follows WHERE follower_id = ? ORDER BY followed_id")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list followees")?;

    Ok(rows.iter().map(|row| row.get("followed_id")).collect())
}

async fn count_sqlite(pool: &SqlitePool, column: &str, user_id: i64) -> Result<i64> {
    // `column` is always one of the two fixed column names
    let sql = format!("SELECT COUNT(*) as count FROM follows WHERE {} = ?", column);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count follows")?;

    Ok(row.get("count"))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, follower_id: i64, followed_id: i64) -> Result<Follow> {
    let now = Utc::now();

    sqlx::query("INSERT INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)")
        .bind(follower_id)
        .bind(followed_id)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create follow")?;

    Ok(Follow {
        follower_id,
        followed_id,
        created_at: now,
    })
}

async fn delete_mysql(pool: &MySqlPool, follower_id: i64, followed_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await
        .context("Failed to delete follow")?;

    Ok(result.rows_affected() > 0)
}

async fn exists_mysql(pool: &MySqlPool, follower_id: i64, followed_id: i64) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM follows WHERE follower_id = ? AND followed_id = ?",
    )
    .bind(follower_id)
    .bind(followed_id)
    .fetch_one(pool)
    .await
    .context("Failed to check follow")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn following_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT followed_id FROM follows WHERE follower_id = ? ORDER BY followed_id")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list followees")?;

    Ok(rows.iter().map(|row| row.get("followed_id")).collect())
}

async fn count_mysql(pool: &MySqlPool, column: &str, user_id: i64) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM follows WHERE {} = ?", column);
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("Failed to count follows")?;

    Ok(row.get("count"))
}
