//! Book model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog book entity.
///
/// Every book belongs to exactly one author (`author_id`). There is no
/// ownership concept for books: any authenticated user may edit any book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    /// Catalog author this book belongs to
    pub author: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Create a new Book. The id is assigned by the database.
    pub fn new(title: String, publication_year: i32, author: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            publication_year,
            author,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a book
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookInput {
    pub title: String,
    pub publication_year: i32,
    pub author: i64,
}

/// Input for updating a book (partial: absent fields keep their value)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookInput {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author: Option<i64>,
}
