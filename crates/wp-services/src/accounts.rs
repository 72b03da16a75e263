use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use wp_core::error::{AppError, Result};
use wp_core::models::{Registration, User};
use wp_core::traits::{AuthProvider, UserRepo};

/// Registration and password login. Session tokens are issued by the
/// HTTP layer from the returned user.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepo>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { users, auth }
    }

    pub async fn register(&self, registration: Registration) -> Result<User> {
        let registration = registration.validate()?;
        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(AppError::Conflict(format!("{} is already registered", registration.email)));
        }

        let hash = self.auth.hash_password(&registration.password).await?;
        let user = User {
            id: Uuid::now_v7(),
            name: registration.name,
            email: registration.email,
            created: Utc::now(),
            hearts: vec![],
        };
        self.users.create_user(&user, &hash).await?;
        log::info!("registered user {}", user.id);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let failed = || AppError::Unauthorized("Failed Login!".into());

        let (user, hash) = self.users.find_by_email(&email).await?.ok_or_else(failed)?;
        if !self.auth.verify_password(password, &hash).await {
            return Err(failed());
        }
        Ok(user)
    }
}
