//! Token creation and validation. Access, refresh, and password-reset
//! tokens carry the same claims but are signed with separate secrets so a
//! leaked reset link can never be replayed as an API credential.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::types::{AuthConfig, Claims};
use crate::error::ApiError;

fn sign(user_id: Uuid, secret: &str, lifetime: Duration) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
}

fn verify(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))
}

pub fn create_access_token(config: &AuthConfig, user_id: Uuid) -> Result<String, ApiError> {
    sign(
        user_id,
        &config.jwt_secret,
        Duration::days(config.access_token_days),
    )
}

pub fn create_refresh_token(config: &AuthConfig, user_id: Uuid) -> Result<String, ApiError> {
    sign(
        user_id,
        &config.refresh_secret,
        Duration::days(config.refresh_token_days),
    )
}

pub fn create_reset_token(config: &AuthConfig, user_id: Uuid) -> Result<String, ApiError> {
    sign(
        user_id,
        &config.reset_secret,
        Duration::hours(config.reset_token_hours),
    )
}

pub fn validate_access_token(config: &AuthConfig, token: &str) -> Result<Claims, ApiError> {
    verify(token, &config.jwt_secret)
}

pub fn validate_reset_token(config: &AuthConfig, token: &str) -> Result<Claims, ApiError> {
    verify(token, &config.reset_secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            reset_secret: "reset-secret".to_string(),
            access_token_days: 7,
            refresh_token_days: 30,
            reset_token_hours: 1,
        }
    }

    #[test]
    fn create_and_validate_access_token() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let token = create_access_token(&config, user_id).unwrap();
        let claims = validate_access_token(&config, &token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let config = test_config();
        assert!(validate_access_token(&config, "not-a-jwt").is_err());
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let config = test_config();
        let other = AuthConfig {
            jwt_secret: "some-other-secret".to_string(),
            ..test_config()
        };

        let token = create_access_token(&other, Uuid::new_v4()).unwrap();
        assert!(validate_access_token(&config, &token).is_err());
    }

    #[test]
    fn reset_tokens_do_not_pass_as_access_tokens() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let reset = create_reset_token(&config, user_id).unwrap();
        assert!(validate_access_token(&config, &reset).is_err());
        assert_eq!(validate_reset_token(&config, &reset).unwrap().sub, user_id);
    }
}
