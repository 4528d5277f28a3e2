//! Notification service

use crate::db::repositories::NotificationRepository;
use crate::models::{Notification, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for notification operations
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Notification missing, or not addressed to the caller. The two are
    /// indistinguishable on purpose.
    #[error("Notification not found")]
    NotFound,

    /// Marked read twice
    #[error("Notification already read")]
    AlreadyRead,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Notification service
pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(notification_repo: Arc<dyn NotificationRepository>) -> Self {
        Self { notification_repo }
    }

    /// List the caller's notifications, unread first, then newest
    pub async fn list(&self, user: &User) -> Result<Vec<Notification>, NotificationError> {
        Ok(self
            .notification_repo
            .list_for_recipient(user.id)
            .await
            .context("Failed to list notifications")?)
    }

    /// Mark one of the caller's notifications as read.
    pub async fn mark_read(&self, user: &User, id: i64) -> Result<(), NotificationError> {
        let notification = self
            .notification_repo
            .get_by_id(id)
            .await
            .context("Failed to get notification")?
            .filter(|n| n.recipient_id == user.id)
            .ok_or(NotificationError::NotFound)?;

        if notification.read {
            return Err(NotificationError::AlreadyRead);
        }

        self.notification_repo
            .mark_read(id)
            .await
            .context("Failed to mark notification read")?;
        Ok(())
    }

    /// Count the caller's unread notifications
    pub async fn unread_count(&self, user: &User) -> Result<i64, NotificationError> {
        Ok(self
            .notification_repo
            .unread_count(user.id)
            .await
            .context("Failed to count unread notifications")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        NotificationRepository, SqlxNotificationRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{NotificationVerb, UserRole};

    async fn setup() -> (DynDatabasePool, NotificationService, User, User) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let recipient = users
            .create_with_profile(&User::new(
                "recipient".to_string(),
                "recipient@example.com".to_string(),
                "hash".to_string(),
                UserRole::Member,
            ))
            .await
            .expect("Failed to create user");
        let actor = users
            .create_with_profile(&User::new(
                "actor".to_string(),
                "actor@example.com".to_string(),
                "hash".to_string(),
                UserRole::Member,
            ))
            .await
            .expect("Failed to create user");

        let service = NotificationService::new(SqlxNotificationRepository::boxed(pool.clone()));
        (pool, service, recipient, actor)
    }

    async fn seed_notification(pool: &DynDatabasePool, recipient: &User, actor: &User) -> i64 {
        SqlxNotificationRepository::new(pool.clone())
            .create(recipient.id, actor.id, NotificationVerb::Followed, None)
            .await
            .expect("Failed to create notification")
            .id
    }

    #[tokio::test]
    async fn test_list_and_unread_count() {
        let (pool, service, recipient, actor) = setup().await;
        seed_notification(&pool, &recipient, &actor).await;
        seed_notification(&pool, &recipient, &actor).await;

        assert_eq!(service.list(&recipient).await.expect("list").len(), 2);
        assert_eq!(service.unread_count(&recipient).await.expect("count"), 2);
        assert_eq!(service.unread_count(&actor).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_mark_read_once() {
        let (pool, service, recipient, actor) = setup().await;
        let id = seed_notification(&pool, &recipient, &actor).await;

        service.mark_read(&recipient, id).await.expect("mark read");
        assert_eq!(service.unread_count(&recipient).await.expect("count"), 0);

        let result = service.mark_read(&recipient, id).await;
        assert!(matches!(result, Err(NotificationError::AlreadyRead)));
    }

    #[tokio::test]
    async fn test_mark_read_foreign_notification_not_found() {
        let (pool, service, recipient, actor) = setup().await;
        let id = seed_notification(&pool, &recipient, &actor).await;

        // The actor is not the recipient; existence is not revealed
        let result = service.mark_read(&actor, id).await;
        assert!(matches!(result, Err(NotificationError::NotFound)));
    }

    #[tokio::test]
    async fn test_mark_read_missing_not_found() {
        let (_pool, service, recipient, _actor) = setup().await;
        let result = service.mark_read(&recipient, 999).await;
        assert!(matches!(result, Err(NotificationError::NotFound)));
    }
}
