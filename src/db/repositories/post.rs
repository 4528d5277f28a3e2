//! Post repository
//!
//! Database operations for posts, including the follow-scoped feed query.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Post;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// List posts newest first with pagination
    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<Post>, i64)>;

    /// List posts authored by followees of `user_id`, newest first.
    ///
    /// The requester's own posts never appear: the follow relation has no
    /// self-edge.
    async fn feed(&self, user_id: i64, offset: i64, limit: i64) -> Result<(Vec<Post>, i64)>;

    /// Update a post
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post (comments cascade)
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(Vec<Post>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), offset, limit).await
            }
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), offset, limit).await,
        }
    }

    async fn feed(&self, user_id: i64, offset: i64, limit: i64) -> Result<(Vec<Post>, i64)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                feed_sqlite(self.pool.as_sqlite().unwrap(), user_id, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                feed_mysql(self.pool.as_mysql().unwrap(), user_id, offset, limit).await
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), post).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (author_id, title, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.author_id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        author_id: post.author_id,
        title: post.title.clone(),
        content: post.content.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(
        r#"
        SELECT id, author_id, title, content, created_at, updated_at
        FROM posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by ID")?;

    Ok(row.map(|row| row_to_post_sqlite(&row)))
}

async fn list_sqlite(pool: &SqlitePool, offset: i64, limit: i64) -> Result<(Vec<Post>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT id, author_id, title, content, created_at, updated_at
        FROM posts
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    let posts = rows.iter().map(row_to_post_sqlite).collect();

    let total: i64 = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?
        .get("count");

    Ok((posts, total))
}

async fn feed_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    offset: i64,
    limit: i64,
) -> Result<(Vec<Post>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.author_id, p.title, p.content, p.created_at, p.updated_at
        FROM posts p
        JOIN follows f ON f.followed_id = p.author_id
        WHERE f.follower_id = ?
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to query feed")?;

    let posts = rows.iter().map(row_to_post_sqlite).collect();

    let total: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) as count
        FROM posts p
        JOIN follows f ON f.followed_id = p.author_id
        WHERE f.follower_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to count feed")?
    .get("count");

    Ok((posts, total))
}

async fn update_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    sqlx::query("UPDATE posts SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(&post.title)
        .bind(&post.content)
        .bind(now)
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    get_by_id_sqlite(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (author_id, title, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.author_id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        author_id: post.author_id,
        title: post.title.clone(),
        content: post.content.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(
        r#"
        SELECT id, author_id, title, content, created_at, updated_at
        FROM posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by ID")?;

    Ok(row.map(|row| row_to_post_mysql(&row)))
}

async fn list_mysql(pool: &MySqlPool, offset: i64, limit: i64) -> Result<(Vec<Post>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT id, author_id, title, content, created_at, updated_at
        FROM posts
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    let posts = rows.iter().map(row_to_post_mysql).collect();

    let total: i64 = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?
        .get("count");

    Ok((posts, total))
}

async fn feed_mysql(
    pool: &MySqlPool,
    user_id: i64,
    offset: i64,
    limit: i64,
) -> Result<(Vec<Post>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.author_id, p.title, p.content, p.created_at, p.updated_at
        FROM posts p
        JOIN follows f ON f.followed_id = p.author_id
        WHERE f.follower_id = ?
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to query feed")?;

    let posts = rows.iter().map(row_to_post_mysql).collect();

    let total: i64 = sqlx::query(
        r#"
        SELECT COUNT(*) as count
        FROM posts p
        JOIN follows f ON f.followed_id = p.author_id
        WHERE f.follower_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to count feed")?
    .get("count");

    Ok((posts, total))
}

async fn update_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    sqlx::query("UPDATE posts SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(&post.title)
        .bind(&post.content)
        .bind(now)
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    get_by_id_mysql(pool, post.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
