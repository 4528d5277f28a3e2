//! User and profile models
//!
//! This module defines the User entity, its role/status enums, and the
//! 1:1 Profile record that is created together with every user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered account.
///
/// Users can have different roles (Admin, Member) which determine what
/// they may do on the user-administration surface. Content ownership is
/// tracked per post/comment via `author_id`, not via roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Short free-form self description
    pub bio: String,
    /// User role
    pub role: UserRole,
    /// Account status (active/banned)
    pub status: UserStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Assigned by the database
            username,
            email,
            password_hash,
            bio: String::new(),
            role,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Check if the user owns the given piece of content
    pub fn owns(&self, author_id: i64) -> bool {
        self.id == author_id
    }

    /// Check if the user is banned
    pub fn is_banned(&self) -> bool {
        self.status == UserStatus::Banned
    }
}

/// User role for the administration surface.
///
/// - Admin: may perform unsafe methods on `/users`
/// - Member: regular account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrator
    Admin,
    /// Regular member
    Member,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Member
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "member" => Ok(UserRole::Member),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Account status.
///
/// - Active: normal access
/// - Banned: cannot login; existing tokens stop resolving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Active account
    Active,
    /// Banned account
    Banned,
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Banned => write!(f, "banned"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "banned" => Ok(UserStatus::Banned),
            _ => Err(anyhow::anyhow!("Invalid user status: {}", s)),
        }
    }
}

/// Profile record, 1:1 with a user.
///
/// Created in the same transaction as the user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    /// Public path of the stored avatar, if one was uploaded
    pub avatar: Option<String>,
    pub updated_at: DateTime<Utc>,
}
