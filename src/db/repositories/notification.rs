//! Notification repository

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Notification, NotificationVerb};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Notification repository trait
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Record a new notification
    async fn create(
        &self,
        recipient_id: i64,
        actor_id: i64,
        verb: NotificationVerb,
        post_id: Option<i64>,
    ) -> Result<Notification>;

    /// Get a notification by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Notification>>;

    /// List all notifications of a recipient, unread first, then newest
    async fn list_for_recipient(&self, recipient_id: i64) -> Result<Vec<Notification>>;

    /// Mark a notification as read
    async fn mark_read(&self, id: i64) -> Result<()>;

    /// Count unread notifications of a recipient
    async fn unread_count(&self, recipient_id: i64) -> Result<i64>;
}

/// SQLx-based notification repository implementation
pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(
        &self,
        recipient_id: i64,
        actor_id: i64,
        verb: NotificationVerb,
        post_id: Option<i64>,
    ) -> Result<Notification> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    recipient_id,
                    actor_id,
                    verb,
                    post_id,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                create_mysql(
                    self.pool.as_mysql().unwrap(),
                    recipient_id,
                    actor_id,
                    verb,
                    post_id,
                )
                .await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Notification>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list_for_recipient(&self, recipient_id: i64) -> Result<Vec<Notification>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), recipient_id).await
            }
            DatabaseDriver::Mysql => list_mysql(self.pool.as_mysql().unwrap(), recipient_id).await,
        }
    }

    async fn mark_read(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => mark_read_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => mark_read_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn unread_count(&self, recipient_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unread_count_sqlite(self.pool.as_sqlite().unwrap(), recipient_id).await
            }
            DatabaseDriver::Mysql => {
                unread_count_mysql(self.pool.as_mysql().unwrap(), recipient_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(
    pool: &SqlitePool,
    recipient_id: i64,
    actor_id: i64,
    verb: NotificationVerb,
    post_id: Option<i64>,
) -> Result<Notification> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, actor_id, verb, post_id, read, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(recipient_id)
    .bind(actor_id)
    .bind(verb.to_string())
    .bind(post_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create notification")?;

    Ok(Notification {
        id: result.last_insert_rowid(),
        recipient_id,
        actor_id,
        verb,
        post_id,
        read: false,
        created_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Notification>> {
    let row = sqlx::query(
        r#"
        SELECT id, recipient_id, actor_id, verb, post_id, read, created_at
        FROM notifications
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get notification")?;

    match row {
        Some(row) => Ok(Some(row_to_notification_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_sqlite(pool: &SqlitePool, recipient_id: i64) -> Result<Vec<Notification>> {
    let rows = sqlx::query(
        r#"
        SELECT id, recipient_id, actor_id, verb, post_id, read, created_at
        FROM notifications
        WHERE recipient_id = ?
        ORDER BY read ASC, created_at DESC, id DESC
        "#,
    )
    .bind(recipient_id)
    .fetch_all(pool)
    .await
    .context("Failed to list notifications")?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row_to_notification_sqlite(&row)?);
    }

    Ok(notifications)
}

async fn mark_read_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to mark notification read")?;

    Ok(())
}

async fn unread_count_sqlite(pool: &SqlitePool, recipient_id: i64) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM notifications WHERE recipient_id = ? AND read = 0",
    )
    .bind(recipient_id)
    .fetch_one(pool)
    .await
    .context("Failed to count unread notifications")?;

    Ok(row.get("count"))
}

fn row_to_notification_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let verb_str: String = row.get("verb");
    let verb = NotificationVerb::from_str(&verb_str)
        .with_context(|| format!("Invalid verb in database: {}", verb_str))?;

    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        actor_id: row.get("actor_id"),
        verb,
        post_id: row.get("post_id"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(
    pool: &MySqlPool,
    recipient_id: i64,
    actor_id: i64,
    verb: NotificationVerb,
    post_id: Option<i64>,
) -> Result<Notification> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, actor_id, verb, post_id, `read`, created_at)
        VALUES (?, ?, ?, ?, FALSE, ?)
        "#,
    )
    .bind(recipient_id)
    .bind(actor_id)
    .bind(verb.to_string())
    .bind(post_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create notification")?;

    Ok(Notification {
        id: result.last_insert_id() as i64,
        recipient_id,
        actor_id,
        verb,
        post_id,
        read: false,
        created_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Notification>> {
    let row = sqlx::query(
        r#"
        SELECT id, recipient_id, actor_id, verb, post_id, `read`, created_at
        FROM notifications
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get notification")?;

    match row {
        Some(row) => Ok(Some(row_to_notification_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_mysql(pool: &MySqlPool, recipient_id: i64) -> Result<Vec<Notification>> {
    let rows = sqlx::query(
        r#"
        SELECT id, recipient_id, actor_id, verb, post_id, `read`, created_at
        FROM notifications
        WHERE recipient_id = ?
        ORDER BY `read` ASC, created_at DESC, id DESC
        "#,
    )
    .bind(recipient_id)
    .fetch_all(pool)
    .await
    .context("Failed to list notifications")?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row_to_notification_mysql(&row)?);
    }

    Ok(notifications)
}

async fn mark_read_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("UPDATE notifications SET `read` = TRUE WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to mark notification read")?;

    Ok(())
}

async fn unread_count_mysql(pool: &MySqlPool, recipient_id: i64) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM notifications WHERE recipient_id = ? AND `read` = FALSE",
    )
    .bind(recipient_id)
    .fetch_one(pool)
    .await
    .context("Failed to count unread notifications")?;

    Ok(row.get("count"))
}

fn row_to_notification_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Notification> {
    let verb_str: String = row.get("verb");
    let verb = NotificationVerb::from_str(&verb_str)
        .with_context(|| format!("Invalid verb in database: {}", verb_str))?;

    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        actor_id: row.get("actor_id"),
        verb,
        post_id: row.get("post_id"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};

    async fn setup() -> (SqlxNotificationRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let mut ids = Vec::new();
        for name in ["recipient", "actor"] {
            let user = users
                .create_with_profile(&User::new(
                    name.to_string(),
                    format!("{}@example.com", name),
                    "hash".to_string(),
                    UserRole::Member,
                ))
                .await
                .expect("Failed to create user");
            ids.push(user.id);
        }

        (SqlxNotificationRepository::new(pool), ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (repo, recipient, actor) = setup().await;

        repo.create(recipient, actor, NotificationVerb::Followed, None)
            .await
            .expect("create");

        let listed = repo.list_for_recipient(recipient).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].verb, NotificationVerb::Followed);
        assert!(!listed[0].read);

        // The actor has no notifications of their own
        assert!(repo.list_for_recipient(actor).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_unread_ordering_and_count() {
        let (repo, recipient, actor) = setup().await;

        let first = repo
            .create(recipient, actor, NotificationVerb::Followed, None)
            .await
            .expect("create");
        repo.create(recipient, actor, NotificationVerb::Commented, None)
            .await
            .expect("create");

        assert_eq!(repo.unread_count(recipient).await.expect("count"), 2);

        repo.mark_read(first.id).await.expect("mark read");

        assert_eq!(repo.unread_count(recipient).await.expect("count"), 1);

        let listed = repo.list_for_recipient(recipient).await.expect("list");
        assert_eq!(listed.len(), 2);
        // Unread entry sorts before the read one
        assert!(!listed[0].read);
        assert!(listed[1].read);
    }

    #[tokio::test]
    async fn test_get_by_id_missing() {
        let (repo, _recipient, _actor) = setup().await;
        assert!(repo.get_by_id(12345).await.expect("query").is_none());
    }
}
