//! Follow service
//!
//! Business logic for the follow graph. The relation is asymmetric and
//! self-edge free; duplicate follows and spurious unfollows are errors,
//! not silent no-ops.

use crate::db::repositories::{FollowRepository, NotificationRepository, UserRepository};
use crate::models::{NotificationVerb, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for follow operations
#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    /// Target user does not exist
    #[error("User not found")]
    TargetNotFound,

    /// Caller tried to follow themselves
    #[error("You cannot follow yourself")]
    SelfFollow,

    /// The edge already exists
    #[error("Already following this user")]
    AlreadyFollowing,

    /// No edge to remove
    #[error("You are not following this user")]
    NotFollowing,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Follow service
pub struct FollowService {
    follow_repo: Arc<dyn FollowRepository>,
    user_repo: Arc<dyn UserRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
}

impl FollowService {
    pub fn new(
        follow_repo: Arc<dyn FollowRepository>,
        user_repo: Arc<dyn UserRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            notification_repo,
        }
    }

    /// Follow another user.
    ///
    /// Rejects unknown targets, self-follows, and duplicate follows. The
    /// target is notified; notification failure never fails the follow.
    pub async fn follow(&self, actor: &User, target_id: i64) -> Result<(), FollowError> {
        if actor.id == target_id {
            return Err(FollowError::SelfFollow);
        }

        self.require_target(target_id).await?;

        if self
            .follow_repo
            .exists(actor.id, target_id)
            .await
            .context("Failed to check follow")?
        {
            return Err(FollowError::AlreadyFollowing);
        }

        self.follow_repo
            .create(actor.id, target_id)
            .await
            .context("Failed to create follow")?;

        if let Err(e) = self
            .notification_repo
            .create(target_id, actor.id, NotificationVerb::Followed, None)
            .await
        {
            tracing::warn!("Failed to create follow notification: {}", e);
        }

        Ok(())
    }

    /// Unfollow a user. Unfollowing someone you don't follow is an error.
    pub async fn unfollow(&self, actor: &User, target_id: i64) -> Result<(), FollowError> {
        self.require_target(target_id).await?;

        let removed = self
            .follow_repo
            .delete(actor.id, target_id)
            .await
            .context("Failed to delete follow")?;

        if !removed {
            return Err(FollowError::NotFollowing);
        }

        Ok(())
    }

    /// Ids of the users that `user_id` follows
    pub async fn following(&self, user_id: i64) -> Result<Vec<i64>, FollowError> {
        Ok(self
            .follow_repo
            .following(user_id)
            .await
            .context("Failed to list followees")?)
    }

    /// (following, followers) counts for a user
    pub async fn counts(&self, user_id: i64) -> Result<(i64, i64), FollowError> {
        let following = self
            .follow_repo
            .following_count(user_id)
            .await
            .context("Failed to count followees")?;
        let followers = self
            .follow_repo
            .follower_count(user_id)
            .await
            .context("Failed to count followers")?;
        Ok((following, followers))
    }

    async fn require_target(&self, target_id: i64) -> Result<(), FollowError> {
        if self
            .user_repo
            .get_by_id(target_id)
            .await
            .context("Failed to check target user")?
            .is_none()
        {
            return Err(FollowError::TargetNotFound);
        }
        Ok(())
    }
}
