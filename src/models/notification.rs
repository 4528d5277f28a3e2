//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the actor did to trigger the notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVerb {
    /// Actor started following the recipient
    Followed,
    /// Actor commented on the recipient's post
    Commented,
}

impl fmt::Display for NotificationVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Followed => write!(f, "followed"),
            Self::Commented => write!(f, "commented"),
        }
    }
}

impl FromStr for NotificationVerb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "followed" => Ok(Self::Followed),
            "commented" => Ok(Self::Commented),
            _ => Err(anyhow::anyhow!("Invalid notification verb: {}", s)),
        }
    }
}

/// Activity event delivered to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub actor_id: i64,
    pub verb: NotificationVerb,
    /// Post the event refers to, when the verb targets one
    pub post_id: Option<i64>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
