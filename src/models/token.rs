//! Credential token models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential resolving to a user identity.
///
/// Issued at registration and login, presented as
/// `Authorization: Token <id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Token value (uuid string)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Time-limited, single-use password reset token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetToken {
    /// Token value (uuid string)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Whether the token was already redeemed
    pub used: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Check if the token can still be redeemed
    pub fn is_redeemable(&self) -> bool {
        !self.used && self.expires_at >= Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_auth_token_expiry() {
        let live = AuthToken {
            id: "t".into(),
            user_id: 1,
            expires_at: Utc::now() + Duration::days(1),
            created_at: Utc::now(),
        };
        let stale = AuthToken {
            expires_at: Utc::now() - Duration::seconds(1),
            ..live.clone()
        };

        assert!(!live.is_expired());
        assert!(stale.is_expired());
    }

    #[test]
    fn test_reset_token_redeemable() {
        let token = PasswordResetToken {
            id: "r".into(),
            user_id: 1,
            expires_at: Utc::now() + Duration::hours(1),
            used: false,
            created_at: Utc::now(),
        };
        assert!(token.is_redeemable());

        let used = PasswordResetToken { used: true, ..token.clone() };
        assert!(!used.is_redeemable());

        let expired = PasswordResetToken {
            expires_at: Utc::now() - Duration::seconds(1),
            ..token
        };
        assert!(!expired.is_redeemable());
    }
}
