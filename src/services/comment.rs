//! Comment service
//!
//! Business logic for comments: validation against a live post,
//! owner-only mutation, and the notification sent to the post author.

use crate::db::repositories::{CommentRepository, NotificationRepository, PostRepository};
use crate::models::{Comment, CreateCommentInput, NotificationVerb, UpdateCommentInput, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment operations
#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    /// Invalid input; `field` keys the error in the response body
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// Comment does not exist
    #[error("Comment not found")]
    NotFound,

    /// Caller is not the author
    #[error("You do not have permission to modify this comment")]
    Forbidden,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn validation(field: &'static str, message: impl Into<String>) -> CommentError {
    CommentError::Validation {
        field,
        message: message.into(),
    }
}

/// Comment service
pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    notification_repo: Arc<dyn NotificationRepository>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            notification_repo,
        }
    }

    /// Create a comment authored by `user`.
    ///
    /// The target post must exist. Commenting on someone else's post
    /// notifies its author; notification failure never fails the comment.
    pub async fn create(
        &self,
        user: &User,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentError> {
        let content = validate_content(input.content)?;

        let post = self
            .post_repo
            .get_by_id(input.post)
            .await
            .context("Failed to check post")?
            .ok_or_else(|| validation("post", "Post does not exist"))?;

        let comment = self
            .comment_repo
            .create(&Comment::new(post.id, user.id, content))
            .await
            .context("Failed to create comment")?;

        if post.author_id != user.id {
            if let Err(e) = self
                .notification_repo
                .create(
                    post.author_id,
                    user.id,
                    NotificationVerb::Commented,
                    Some(post.id),
                )
                .await
            {
                tracing::warn!("Failed to create comment notification: {}", e);
            }
        }

        Ok(comment)
    }

    /// Get a comment by id
    pub async fn get(&self, id: i64) -> Result<Option<Comment>, CommentError> {
        Ok(self
            .comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?)
    }

    /// List comments, optionally restricted to one post
    pub async fn list(&self, post_id: Option<i64>) -> Result<Vec<Comment>, CommentError> {
        Ok(self
            .comment_repo
            .list(post_id)
            .await
            .context("Failed to list comments")?)
    }

    /// Update a comment; only the author may.
    pub async fn update(
        &self,
        id: i64,
        user: &User,
        input: UpdateCommentInput,
    ) -> Result<Comment, CommentError> {
        let mut comment = self
            .comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or(CommentError::NotFound)?;

        if !user.owns(comment.author_id) {
            return Err(CommentError::Forbidden);
        }

        if let Some(content) = input.content {
            comment.content = validate_content(content)?;
        }

        Ok(self
            .comment_repo
            .update(&comment)
            .await
            .context("Failed to update comment")?)
    }

    /// Delete a comment; only the author may.
    pub async fn delete(&self, id: i64, user: &User) -> Result<(), CommentError> {
        let comment = self
            .comment_repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or(CommentError::NotFound)?;

        if !user.owns(comment.author_id) {
            return Err(CommentError::Forbidden);
        }

        self.comment_repo
            .delete(id)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }
}

fn validate_content(content: String) -> Result<String, CommentError> {
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(validation("content", "Content cannot be empty"));
    }
    Ok(content)
}
