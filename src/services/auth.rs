use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::MAX_USERNAME_LEN;
use crate::services::{TokenCodec, UserRepository};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    codec: Arc<TokenCodec>,
}

impl AuthService {
    pub fn new(users: UserRepository, codec: Arc<TokenCodec>) -> Self {
        Self { users, codec }
    }

    /// Check a username/password pair.
    ///
    /// Unknown users, lookup failures and wrong passwords all yield `false`.
    pub async fn verify(&self, username: &str, password: &str) -> bool {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return false;
        }

        let user = match self.users.find_by_username(username).await {
            Ok(Some(user)) => user,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("Error looking up user {}: {}", username, e);
                return false;
            }
        };

        match Self::verify_password(password, &user.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!("Stored hash for {} is unusable: {}", username, e);
                false
            }
        }
    }

    /// Verify credentials and issue a session token for the trimmed username
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        if !self.verify(username, password).await {
            tracing::warn!(username = username.trim(), "Login rejected");
            return Err(AppError::Unauthorized);
        }

        let token = self.codec.issue(username.trim())?;
        tracing::info!(username = username.trim(), "Login succeeded");
        Ok(token)
    }

    /// Hash password using Argon2
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        Ok(password_hash)
    }

    /// Verify password against hash
    fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
