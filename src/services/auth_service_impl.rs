//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::info;

use crate::db::repositories::user::generate_token;
use crate::db::{Store, User};
use crate::services::auth_service::{AuthError, AuthService, LoginResult, UserInfo};

pub struct SeaOrmAuthService {
    store: Store,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Trims and lowercases an email, rejecting anything that is not `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex")
    });

    let normalized = email.trim().to_lowercase();
    if normalized.len() > 254 || !re.is_match(&normalized) {
        return Err(AuthError::Validation(format!(
            "Invalid email address: '{}'",
            email.trim()
        )));
    }
    Ok(normalized)
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, email: &str) -> Result<LoginResult, AuthError> {
        let email = normalize_email(email)?;

        let user = if let Some(user) = self.store.get_user_by_email(&email).await? {
            user
        } else {
            match self.store.create_user(&email, &generate_token()).await {
                Ok(user) => {
                    info!(user_id = user.id, "Created user on first login");
                    user
                }
                // A concurrent first login may have won the unique index.
                Err(e) => self
                    .store
                    .get_user_by_email(&email)
                    .await?
                    .ok_or_else(|| AuthError::Internal(e.to_string()))?,
            }
        };

        Ok(LoginResult {
            user_id: user.id,
            email: user.email,
            token: user.token,
        })
    }

    async fn resolve_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.store.get_user_by_token(token).await?)
    }

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user(user_id).await?)
    }

    async fn get_user_info(&self, user_id: i32) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserInfo {
            email: user.email,
            created_at: user.created_at,
            plan: user.plan,
        })
    }
}
