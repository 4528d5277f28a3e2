//! Service layer
//!
//! Business logic between the HTTP handlers and the repositories:
//! validation, authorization predicates, token issuance, and the side
//! effects (notifications, mail) that belong to an operation.

pub mod account;
pub mod avatar;
pub mod catalog;
pub mod comment;
pub mod email;
pub mod follow;
pub mod notification;
pub mod password;
pub mod post;

pub use account::{AccountError, AccountService};
pub use avatar::{process_avatar, AvatarError, ProcessedAvatar};
pub use catalog::{CatalogError, CatalogService};
pub use comment::{CommentError, CommentService};
pub use email::Mailer;
pub use follow::{FollowError, FollowService};
pub use notification::{NotificationError, NotificationService};
pub use post::{PostError, PostService};
