use std::sync::Arc;

use uuid::Uuid;
use wp_core::error::{AppError, Result};
use wp_core::models::User;
use wp_core::traits::UserRepo;

/// Flips a report's membership in a user's hearts.
///
/// The report id is not checked against existing reports; hearts are plain
/// set membership on the user.
#[derive(Clone)]
pub struct HeartToggle {
    users: Arc<dyn UserRepo>,
}

impl HeartToggle {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    /// Returns the user as stored after the toggle.
    pub async fn toggle(&self, user_id: Uuid, report_id: Uuid) -> Result<User> {
        let user = self.load(user_id).await?;

        if user.has_heart(report_id) {
            self.users.remove_heart(user_id, report_id).await?;
            log::debug!("user {} un-hearted {}", user_id, report_id);
        } else {
            self.users.add_heart(user_id, report_id).await?;
            log::debug!("user {} hearted {}", user_id, report_id);
        }

        self.load(user_id).await
    }

    async fn load(&self, user_id: Uuid) -> Result<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }
}
