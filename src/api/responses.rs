//! Shared API response types
//!
//! Wire representations used across endpoints, plus the conversions from
//! the domain models.

use serde::{Deserialize, Serialize};

use crate::models::{Author, Book, Comment, Notification, Post, User};

// ============================================================================
// Catalog
// ============================================================================

/// Book representation
#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    /// Catalog author id
    pub author: i64,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            publication_year: book.publication_year,
            author: book.author,
        }
    }
}

/// Author list representation
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: i64,
    pub name: String,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            name: author.name,
        }
    }
}

/// Author detail with its books nested
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorDetailResponse {
    pub id: i64,
    pub name: String,
    pub books: Vec<BookResponse>,
}

impl AuthorDetailResponse {
    pub fn new(author: Author, books: Vec<Book>) -> Self {
        Self {
            id: author.id,
            name: author.name,
            books: books.into_iter().map(BookResponse::from).collect(),
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// User representation (never carries the password hash)
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub role: String,
    pub status: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            bio: user.bio,
            role: user.role.to_string(),
            status: user.status.to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for successful registration/login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Current-user profile view
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub following: i64,
    pub followers: i64,
}

// ============================================================================
// Posts & comments
// ============================================================================

/// Post representation
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub author: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author: post.author_id,
            title: post.title,
            content: post.content,
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

/// Comment representation
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post: i64,
    pub author: i64,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post: comment.post_id,
            author: comment.author_id,
            content: comment.content,
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.to_rfc3339(),
        }
    }
}

/// Paginated post list
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedPostsResponse {
    pub posts: Vec<PostResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl PaginatedPostsResponse {
    pub fn new(posts: Vec<Post>, total: i64, page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            ((total as u64).div_ceil(u64::from(page_size))) as u32
        };
        Self {
            posts: posts.into_iter().map(PostResponse::from).collect(),
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification representation
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: i64,
    pub actor: i64,
    pub verb: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<i64>,
    pub read: bool,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            actor: notification.actor_id,
            verb: notification.verb.to_string(),
            post: notification.post_id,
            read: notification.read,
            created_at: notification.created_at.to_rfc3339(),
        }
    }
}
