//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity, owned by the user who created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new Post. The id is assigned by the database.
    pub fn new(author_id: i64, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            author_id,
            title,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
}

/// Input for updating a post (partial: absent fields keep their value)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
}
