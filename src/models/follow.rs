//! Follow model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One edge of the asymmetric follow graph.
///
/// "a follows b" implies nothing about "b follows a". The relation never
/// contains a self-edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: i64,
    pub followed_id: i64,
    pub created_at: DateTime<Utc>,
}
