//! Author model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog author entity.
///
/// An author owns zero or more books. Deleting an author cascades to its
/// books at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Author {
    /// Create a new Author. The id is assigned by the database.
    pub fn new(name: String) -> Self {
        Self {
            id: 0,
            name,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating an author
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthorInput {
    pub name: String,
}

/// Input for updating an author
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAuthorInput {
    pub name: Option<String>,
}
