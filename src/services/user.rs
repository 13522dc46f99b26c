use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{User, MAX_USERNAME_LEN};

/// Read access to provisioned users, plus the insert used by `create-user`
#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Find a user by exact username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user: Option<User> =
            sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(user)
    }

    /// Get a user by username
    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Insert a new user with an already hashed password
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::BadRequest(format!(
                "Username must be 1 to {} characters",
                MAX_USERNAME_LEN
            )));
        }

        if self.find_by_username(username).await?.is_some() {
            return Err(AppError::BadRequest("Username already exists".to_string()));
        }

        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(self.db.pool())
            .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }
}
