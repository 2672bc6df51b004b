// Authentication: password hashing and bearer tokens.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;

use crate::config::SecurityConfig;
use crate::core::Id;
use crate::error::{AppError, AppResult};

/// JWT claims carried by every authenticated request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Id,
    pub login_name: String,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and validates HS256 bearer tokens and hashes passwords.
pub struct SecurityService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_secs: u64,
}

impl SecurityService {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_ttl_secs: config.token_ttl_secs,
        }
    }

    /// Sign a token for the given user
    #[instrument(skip(self))]
    pub fn issue_token(&self, user_id: Id, login_name: &str) -> AppResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(format!("System clock before epoch: {}", e)))?
            .as_secs();

        let claims = Claims {
            user_id,
            login_name: login_name.to_string(),
            iat: now,
            exp: now + self.token_ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Validate a token and return its claims. Expired, malformed or
    /// foreign-signed tokens are all `Unauthorized`.
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Hash a password with Argon2 and a random salt
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        Ok(password_hash.to_string())
    }
}
