//! Repository layer
//!
//! Data access for every entity, as a trait per entity plus a
//! `Sqlx*Repository` implementation dispatching between SQLite and MySQL.
//! Services depend on the traits, never on a concrete backend.

pub mod author;
pub mod book;
pub mod comment;
pub mod follow;
pub mod notification;
pub mod post;
pub mod token;
pub mod user;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use book::{BookOrder, BookOrderField, BookQuery, BookRepository, SqlxBookRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use token::{
    AuthTokenRepository, PasswordResetRepository, SqlxAuthTokenRepository,
    SqlxPasswordResetRepository,
};
pub use user::{SqlxUserRepository, UserRepository};
