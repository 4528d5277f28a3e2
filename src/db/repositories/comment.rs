//! Comment repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// List comments, optionally restricted to one post, newest first
    async fn list(&self, post_id: Option<i64>) -> Result<Vec<Comment>>;

    /// Update a comment
    async fn update(&self, comment: &Comment) -> Result<Comment>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), comment).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), comment).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, post_id: Option<i64>) -> Result<Vec<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_sqlite(self.pool.as_sqlite().unwrap(), post_id).await,
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), post_id).await,
        }
    }

    async fn update(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_sqlite(self.pool.as_sqlite().unwrap(), comment).await,
            DatabaseDriver::Mysql => update_mysql(self.pool.as_mysql().unwrap(), comment).await,
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

async fn create_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (post_id, author_id, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.author_id)
    .bind(&comment.content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        post_id: comment.post_id,
        author_id: comment.author_id,
        content: comment.content.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        r#"
        SELECT id, post_id, author_id, content, created_at, updated_at
        FROM comments
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    Ok(row.map(|row| row_to_comment_sqlite(&row)))
}

async fn list_sqlite(pool: &SqlitePool, post_id: Option<i64>) -> Result<Vec<Comment>> {
    let rows = match post_id {
        Some(post_id) => {
            sqlx::query(
                r#"
                SELECT id, post_id, author_id, content, created_at, updated_at
                FROM comments
                WHERE post_id = ?
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(post_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, post_id, author_id, content, created_at, updated_at
                FROM comments
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list comments")?;

    Ok(rows.iter().map(row_to_comment_sqlite).collect())
}

async fn update_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(&comment.content)
        .bind(now)
        .bind(comment.id)
        .execute(pool)
        .await
        .context("Failed to update comment")?;

    get_by_id_sqlite(pool, comment.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
}

async fn delete_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (post_id, author_id, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.post_id)
    .bind(comment.author_id)
    .bind(&comment.content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        post_id: comment.post_id,
        author_id: comment.author_id,
        content: comment.content.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        r#"
        SELECT id, post_id, author_id, content, created_at, updated_at
        FROM comments
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    Ok(row.map(|row| row_to_comment_mysql(&row)))
}

async fn list_mysql(pool: &MySqlPool, post_id: Option<i64>) -> Result<Vec<Comment>> {
    let rows = match post_id {
        Some(post_id) => {
            sqlx::query(
                r#"
                SELECT id, post_id, author_id, content, created_at, updated_at
                FROM comments
                WHERE post_id = ?
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(post_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, post_id, author_id, content, created_at, updated_at
                FROM comments
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list comments")?;

    Ok(rows.iter().map(row_to_comment_mysql).collect())
}

async fn update_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(&comment.content)
        .bind(now)
        .bind(comment.id)
        .execute(pool)
        .await
        .context("Failed to update comment")?;

    get_by_id_mysql(pool, comment.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Comment not found after update"))
}

async fn delete_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;

    Ok(())
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{Post, User, UserRole};

    async fn setup() -> (DynDatabasePool, SqlxCommentRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create_with_profile(&User::new(
                "commenter".to_string(),
                "commenter@example.com".to_string(),
                "hash".to_string(),
                UserRole::Member,
            ))
            .await
            .expect("Failed to create user");

        let posts = SqlxPostRepository::new(pool.clone());
        let post = posts
            .create(&Post::new(user.id, "Post".to_string(), "body".to_string()))
            .await
            .expect("Failed to create post");

        (pool.clone(), SqlxCommentRepository::new(pool), user.id, post.id)
    }

    #[tokio::test]
    async fn test_create_and_get_comment() {
        let (_pool, comments, user_id, post_id) = setup().await;

        let created = comments
            .create(&Comment::new(post_id, user_id, "Nice post".to_string()))
            .await
            .expect("Failed to create comment");

        assert!(created.id > 0);

        let found = comments
            .get_by_id(created.id)
            .await
            .expect("query")
            .expect("Comment not found");
        assert_eq!(found.content, "Nice post");
        assert_eq!(found.post_id, post_id);
        assert_eq!(found.author_id, user_id);
    }

    #[tokio::test]
    async fn test_list_by_post() {
        let (pool, comments, user_id, post_id) = setup().await;

        let posts = SqlxPostRepository::new(pool);
        let other_post = posts
            .create(&Post::new(user_id, "Other".to_string(), "body".to_string()))
            .await
            .expect("create post");

        comments
            .create(&Comment::new(post_id, user_id, "one".to_string()))
            .await
            .expect("create");
        comments
            .create(&Comment::new(other_post.id, user_id, "two".to_string()))
            .await
            .expect("create");

        let on_post = comments.list(Some(post_id)).await.expect("list");
        assert_eq!(on_post.len(), 1);
        assert_eq!(on_post[0].content, "one");

        let all = comments.list(None).await.expect("list");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_comment() {
        let (_pool, comments, user_id, post_id) = setup().await;
        let mut comment = comments
            .create(&Comment::new(post_id, user_id, "typo".to_string()))
            .await
            .expect("create");

        comment.content = "fixed".to_string();
        let updated = comments.update(&comment).await.expect("update");

        assert_eq!(updated.content, "fixed");
        assert_eq!(updated.created_at, comment.created_at);
    }

    #[tokio::test]
    async fn test_delete_comment() {
        let (_pool, comments, user_id, post_id) = setup().await;
        let comment = comments
            .create(&Comment::new(post_id, user_id, "bye".to_string()))
            .await
            .expect("create");

        comments.delete(comment.id).await.expect("delete");
        assert!(comments.get_by_id(comment.id).await.expect("query").is_none());
    }

    #[tokio::test]
    async fn test_comment_requires_existing_post() {
        let (_pool, comments, user_id, _post_id) = setup().await;

        let result = comments
            .create(&Comment::new(424242, user_id, "orphan".to_string()))
            .await;
        assert!(result.is_err(), "FK violation expected");
    }
}
