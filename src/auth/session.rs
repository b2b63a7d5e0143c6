//! HS256 session tokens

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthError;
use crate::core_types::DriverId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Driver id for drivers, username for admins
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn driver_id(&self) -> Option<DriverId> {
        match self.role {
            Role::Driver => self.sub.parse().ok(),
            Role::Admin => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    pub fn issue(&self, subject: &str, role: Role) -> Result<Session, AuthError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: subject.to_string(),
            role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(Session {
            token,
            role,
            expires_at,
        })
    }

    pub fn issue_for_driver(&self, driver_id: DriverId) -> Result<Session, AuthError> {
        self.issue(&driver_id.to_string(), Role::Driver)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_token_roundtrip() {
        let sessions = SessionManager::new("test-secret", 24);
        let session = sessions.issue_for_driver(42).unwrap();
        let claims = sessions.verify(&session.token).unwrap();
        assert_eq!(claims.driver_id(), Some(42));
        assert!(!claims.is_admin());
        assert!(session.expires_at > Utc::now());
    }

    #[test]
    fn test_admin_token_has_no_driver_id() {
        let sessions = SessionManager::new("test-secret", 24);
        let session = sessions.issue("admin", Role::Admin).unwrap();
        let claims = sessions.verify(&session.token).unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.driver_id(), None);
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let ours = SessionManager::new("secret-a", 24);
        let theirs = SessionManager::new("secret-b", 24);
        let session = theirs.issue_for_driver(1).unwrap();
        assert!(matches!(ours.verify(&session.token), Err(AuthError::InvalidToken)));
        assert!(matches!(ours.verify("garbage"), Err(AuthError::InvalidToken)));
    }
}
