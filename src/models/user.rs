use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Longest accepted username, in characters
pub const MAX_USERNAME_LEN: usize = 64;

/// User model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Session info returned after login and by the status endpoint
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub username: String,
}

/// Current authenticated user (extracted from the session cookie)
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

/// JWT Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub exp: i64, // expiration time, unix seconds
}
