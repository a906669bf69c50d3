use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT claims shared by access, refresh, and reset tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// The authenticated caller, inserted as a request extension by
/// `require_auth`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Token secrets and lifetimes, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub refresh_secret: String,
    pub reset_secret: String,
    pub access_token_days: i64,
    pub refresh_token_days: i64,
    pub reset_token_hours: i64,
}

impl AuthConfig {
    /// `JWT_SECRET` is mandatory; the refresh and reset secrets fall back to
    /// it when not set separately.
    pub fn from_env() -> Result<Self, ApiError> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ApiError::Config("JWT_SECRET environment variable not set".to_string()))?;

        let refresh_secret =
            std::env::var("REFRESH_TOKEN_SECRET").unwrap_or_else(|_| jwt_secret.clone());
        let reset_secret =
            std::env::var("PASSWORD_RESET_SECRET").unwrap_or_else(|_| jwt_secret.clone());

        Ok(Self {
            jwt_secret,
            refresh_secret,
            reset_secret,
            access_token_days: 7,
            refresh_token_days: 30,
            reset_token_hours: 1,
        })
    }
}
