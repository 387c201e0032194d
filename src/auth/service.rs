//! JWT auth service

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::error::AppError;
use crate::ledger::{User, UserRepo};

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id as string)
    pub sub: String,
    /// Expiration time (UTC timestamp)
    pub exp: usize,
    /// Issued at
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub.parse::<i64>().map_err(|_| AppError::TokenInvalid)
    }
}

pub struct AuthService {
    pool: PgPool,
    jwt_secret: String,
    expiry_secs: u64,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_secret: String, expiry_secs: u64) -> Self {
        Self {
            pool,
            jwt_secret,
            expiry_secs,
        }
    }

    /// Hex SHA-256 of a password, the credential format the wallet contract
    /// fixes for seeded players.
    pub fn hash_password(password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }

    /// Verify credentials and issue a token
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AppError> {
        let user = UserRepo::get_by_username(&self.pool, username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if Self::hash_password(password) != user.password {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_token(user.id)?;
        Ok((token, user))
    }

    /// Issue a token for a user id
    pub fn issue_token(&self, user_id: i64) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.expiry_secs as i64) as usize,
            iat: now as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|_| AppError::TokenInvalid)
    }

    /// Verify a token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::TokenInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        // The pool is only touched by login(); token tests never connect
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        AuthService::new(pool, "test-secret".to_string(), 3600)
    }

    #[test]
    fn test_hash_password_is_deterministic_sha256_hex() {
        let hash = AuthService::hash_password("password123");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, AuthService::hash_password("password123"));
        assert_ne!(hash, AuthService::hash_password("password124"));
    }

    #[tokio::test]
    async fn test_token_roundtrip() {
        let svc = test_service();
        let token = svc.issue_token(34633089486).unwrap();
        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 34633089486);
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_secret() {
        let svc = test_service();
        let token = svc.issue_token(1).unwrap();

        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let other = AuthService::new(pool, "other-secret".to_string(), 3600);
        assert!(matches!(
            other.verify_token(&token),
            Err(AppError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        let svc = test_service();
        assert!(matches!(
            svc.verify_token("not.a.token"),
            Err(AppError::TokenInvalid)
        ));
    }

    #[test]
    fn test_claims_user_id_parse() {
        let claims = Claims {
            sub: "42".to_string(),
            exp: 0,
            iat: 0,
        };
        assert_eq!(claims.user_id().unwrap(), 42);

        let claims = Claims {
            sub: "not-a-number".to_string(),
            exp: 0,
            iat: 0,
        };
        assert!(claims.user_id().is_err());
    }
}
