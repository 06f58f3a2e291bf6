use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::User;

/// Signed session claims. `is_admin` is always present in the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn for_user(user: &User, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, returning the claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(format!("Invalid session token: {}", e)))?;

    Ok(token_data.claims)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    // Malformed hashes (e.g. accounts without a password) never verify
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn user(is_admin: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "vet@example.com".into(),
            name: "Vet".into(),
            password_hash: String::new(),
            is_admin,
            subscription_tier: "free".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_round_trip_keeps_admin_flag() {
        let security = AppConfig::development().security;
        let admin = user(true);
        let token = generate_jwt(&Claims::for_user(&admin, 1), &security).unwrap();

        let claims = validate_jwt(&token, &security).unwrap();
        assert_eq!(claims.sub, admin.id);
        assert!(claims.is_admin);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let security = AppConfig::development().security;
        let mut other = security.clone();
        other.jwt_secret = "someone-else".into();

        let token = generate_jwt(&Claims::for_user(&user(false), 1), &other).unwrap();
        assert!(matches!(validate_jwt(&token, &security), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let security = AppConfig::development().security;
        let mut claims = Claims::for_user(&user(false), 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&claims, &security).unwrap();
        assert!(validate_jwt(&token, &security).is_err());
    }

    #[test]
    fn tokens_without_admin_flag_do_not_decode() {
        #[derive(Serialize)]
        struct Legacy {
            sub: Uuid,
            email: String,
            exp: i64,
            iat: i64,
        }

        let security = AppConfig::development().security;
        let legacy = Legacy {
            sub: Uuid::new_v4(),
            email: "old@example.com".into(),
            exp: Utc::now().timestamp() + 60,
            iat: Utc::now().timestamp(),
        };
        let token = encode(
            &Header::default(),
            &legacy,
            &EncodingKey::from_secret(security.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(validate_jwt(&token, &security).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        let mut security = AppConfig::development().security;
        security.jwt_secret.clear();
        assert!(matches!(
            generate_jwt(&Claims::for_user(&user(false), 1), &security),
            Err(AuthError::MissingSecret)
        ));
    }

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("biscuits", 4).unwrap();
        assert!(verify_password("biscuits", &hash));
        assert!(!verify_password("kibble", &hash));
        assert!(!verify_password("biscuits", ""));
    }
}
