use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{SecurityConfig, MAX_JWT_EXPIRY_HOURS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// `expiry_hours` is clamped to [`MAX_JWT_EXPIRY_HOURS`]
    pub fn new(user_id: Uuid, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let hours = i64::try_from(expiry_hours.min(MAX_JWT_EXPIRY_HOURS)).unwrap_or(0);
        let lifetime = Duration::try_hours(hours).unwrap_or_else(Duration::zero);
        let exp = (now + lifetime).timestamp();

        Self {
            sub: user_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, returning the embedded claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(secret: &str) -> SecurityConfig {
        SecurityConfig {
            jwt_secret: secret.to_string(),
            jwt_expiry_hours: 1,
            cors_origins: vec![],
        }
    }

    #[test]
    fn token_round_trips_user_id() {
        let user_id = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(user_id, 1), &security("s3cret")).unwrap();
        let claims = validate_jwt(&token, &security("s3cret")).unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = generate_jwt(&Claims::new(Uuid::new_v4(), 1), &security("one")).unwrap();
        assert!(matches!(
            validate_jwt(&token, &security("two")),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::new(Uuid::new_v4(), 1);
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = generate_jwt(&claims, &security("s3cret")).unwrap();
        assert!(validate_jwt(&token, &security("s3cret")).is_err());
    }

    #[test]
    fn huge_expiry_is_clamped() {
        let claims = Claims::new(Uuid::new_v4(), u64::MAX);
        let max_seconds = MAX_JWT_EXPIRY_HOURS as i64 * 3600;
        assert!(claims.exp - claims.iat <= max_seconds);
        assert!(claims.exp - claims.iat >= max_seconds - 1);
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let result = generate_jwt(&Claims::new(Uuid::new_v4(), 1), &security(""));
        assert!(matches!(result, Err(JwtError::InvalidSecret)));
    }
}
