use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockshift_core::UserId;

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims expected once a token has been decoded and its
/// signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the numeric user id.
    pub sub: UserId,

    /// Display name of the user, carried into outbound audit fields.
    pub username: String,

    /// RBAC roles granted to the user.
    pub roles: Vec<Role>,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate the claims' time window.
///
/// Signature verification happens in [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(1),
            username: "olena".to_string(),
            roles: vec![Role::LOGISTICIAN],
            issued_at,
            expires_at,
        }
    }

    #[test]
    fn accepts_claims_inside_window() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(1), now + Duration::minutes(5));
        assert_eq!(validate_claims(&c, now), Ok(()));
    }

    #[test]
    fn rejects_expired_future_and_inverted_windows() {
        let now = Utc::now();
        assert_eq!(
            validate_claims(&claims(now - Duration::hours(2), now - Duration::hours(1)), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims(now + Duration::hours(1), now + Duration::hours(2)), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims(now, now), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
