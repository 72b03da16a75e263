//! # wp-services
//!
//! Report lifecycle, comments, hearts and the read-side queries, written
//! against the `wp-core` ports so any storage plugin can back them.

pub mod accounts;
pub mod comments;
pub mod hearts;
pub mod queries;
pub mod reports;

use std::sync::Arc;

use wp_core::traits::{AuthProvider, CommentRepo, ReportRepo, UserRepo};

pub use accounts::AccountService;
pub use comments::CommentManager;
pub use hearts::HeartToggle;
pub use queries::QueryService;
pub use reports::ReportManager;

/// Every service, wired to the same set of ports.
#[derive(Clone)]
pub struct Services {
    pub reports: ReportManager,
    pub comments: CommentManager,
    pub hearts: HeartToggle,
    pub queries: QueryService,
    pub accounts: AccountService,
}

impl Services {
    pub fn new(
        reports: Arc<dyn ReportRepo>,
        comments: Arc<dyn CommentRepo>,
        users: Arc<dyn UserRepo>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            reports: ReportManager::new(reports.clone(), comments.clone(), users.clone()),
            comments: CommentManager::new(reports.clone(), comments, users.clone()),
            hearts: HeartToggle::new(users.clone()),
            queries: QueryService::new(reports),
            accounts: AccountService::new(users, auth),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;
    use wp_core::models::{ReportDraft, User};
    use wp_core::traits::UserRepo;
    use wp_db_sqlite::SqliteStore;

    use crate::{CommentManager, HeartToggle, QueryService, ReportManager};

    pub struct Fixture {
        pub store: Arc<SqliteStore>,
        pub reports: ReportManager,
        pub comments: CommentManager,
        pub hearts: HeartToggle,
        pub queries: QueryService,
    }

    impl Fixture {
        pub async fn new() -> Self {
            let store = Arc::new(SqliteStore::new("sqlite::memory:").await.expect("in-memory store"));
            Self {
                reports: ReportManager::new(store.clone(), store.clone(), store.clone()),
                comments: CommentManager::new(store.clone(), store.clone(), store.clone()),
                hearts: HeartToggle::new(store.clone()),
                queries: QueryService::new(store.clone()),
                store,
            }
        }

        pub async fn user(&self, name: &str) -> Uuid {
            let user = User {
                id: Uuid::now_v7(),
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                created: Utc::now(),
                hearts: vec![],
            };
            self.store.create_user(&user, "not-a-real-hash").await.expect("create user");
            user.id
        }
    }

    pub fn draft(title: &str, lng: f64, lat: f64) -> ReportDraft {
        ReportDraft {
            title: title.to_string(),
            description: None,
            tags: vec![],
            lng,
            lat,
            address: "Beach Rd".to_string(),
            photo: None,
        }
    }
}
