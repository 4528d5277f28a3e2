//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity, belonging to one post and one user.
///
/// Both references are live at creation time; either side cascading away
/// removes the comment at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Create a new Comment. The id is assigned by the database.
    pub fn new(post_id: i64, author_id: i64, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            post_id,
            author_id,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    /// Target post id
    pub post: i64,
    pub content: String,
}

/// Input for updating a comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCommentInput {
    pub content: Option<String>,
}
