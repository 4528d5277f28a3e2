//! Post service
//!
//! Business logic for posts: validation, owner-only mutation, the public
//! listing, and the follow-scoped feed.

use crate::db::repositories::PostRepository;
use crate::models::{CreatePostInput, Post, UpdatePostInput, User};
use anyhow::Context;
use std::sync::Arc;

/// Maximum post title length
const MAX_TITLE_LENGTH: usize = 200;

/// Error types for post operations
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    /// Invalid input; `field` keys the error in the response body
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// Post does not exist
    #[error("Post not found")]
    NotFound,

    /// Caller is not the author
    #[error("You do not have permission to modify this post")]
    Forbidden,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn validation(field: &'static str, message: impl Into<String>) -> PostError {
    PostError::Validation {
        field,
        message: message.into(),
    }
}

/// Post service
pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(post_repo: Arc<dyn PostRepository>) -> Self {
        Self { post_repo }
    }

    /// Create a post authored by `user`.
    pub async fn create(&self, user: &User, input: CreatePostInput) -> Result<Post, PostError> {
        let title = validate_title(input.title)?;
        let content = validate_content(input.content)?;

        Ok(self
            .post_repo
            .create(&Post::new(user.id, title, content))
            .await
            .context("Failed to create post")?)
    }

    /// Get a post by id
    pub async fn get(&self, id: i64) -> Result<Option<Post>, PostError> {
        Ok(self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?)
    }

    /// List posts newest first
    pub async fn list(&self, page: u32, page_size: u32) -> Result<(Vec<Post>, i64), PostError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        Ok(self
            .post_repo
            .list(offset, i64::from(page_size))
            .await
            .context("Failed to list posts")?)
    }

    /// The personalized feed: posts authored by followees of `user`,
    /// newest first. The user's own posts never appear.
    pub async fn feed(
        &self,
        user: &User,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<Post>, i64), PostError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        Ok(self
            .post_repo
            .feed(user.id, offset, i64::from(page_size))
            .await
            .context("Failed to load feed")?)
    }

    /// Update a post; only the author may.
    pub async fn update(
        &self,
        id: i64,
        user: &User,
        input: UpdatePostInput,
    ) -> Result<Post, PostError> {
        let mut post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostError::NotFound)?;

        if !user.owns(post.author_id) {
            return Err(PostError::Forbidden);
        }

        if let Some(title) = input.title {
            post.title = validate_title(title)?;
        }
        if let Some(content) = input.content {
            post.content = validate_content(content)?;
        }

        Ok(self
            .post_repo
            .update(&post)
            .await
            .context("Failed to update post")?)
    }

    /// Delete a post; only the author may. Comments cascade.
    pub async fn delete(&self, id: i64, user: &User) -> Result<(), PostError> {
        let post = self
            .post_repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostError::NotFound)?;

        if !user.owns(post.author_id) {
            return Err(PostError::Forbidden);
        }

        self.post_repo
            .delete(id)
            .await
            .context("Failed to delete post")?;
        Ok(())
    }
}

fn validate_title(title: String) -> Result<String, PostError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(validation("title", "Title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(validation(
            "title",
            format!("Title cannot exceed {} characters", MAX_TITLE_LENGTH),
        ));
    }
    Ok(title)
}

fn validate_content(content: String) -> Result<String, PostError> {
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(validation("content", "Content cannot be empty"));
    }
    Ok(content)
}
