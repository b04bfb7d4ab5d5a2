//! Domain service for email login and token resolution.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Profile DTO for `/auth/me`.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub email: String,
    pub created_at: String,
    pub plan: String,
}

/// Login result containing the user and their bearer token.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: i32,
    pub email: String,
    pub token: String,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Returns the user for `email`, creating it on first login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the email is malformed.
    async fn login(&self, email: &str) -> Result<LoginResult, AuthError>;

    /// Resolves a bearer token or API key to its user.
    async fn resolve_token(&self, token: &str) -> Result<Option<User>, AuthError>;

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, AuthError>;

    async fn get_user_info(&self, user_id: i32) -> Result<UserInfo, AuthError>;
}
