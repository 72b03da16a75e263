//! Runtime settings, read from the environment (and `.env` when present).

use std::env;
use std::path::PathBuf;

use uuid::Uuid;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:waypoint.db";
pub const DEFAULT_UPLOAD_DIR: &str = "./public/uploads";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub session_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let session_secret = lookup("WAYPOINT_SESSION_SECRET")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| {
                log::warn!("WAYPOINT_SESSION_SECRET is not set; sessions will not survive a restart");
                format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
            });

        Self {
            bind: var("WAYPOINT_BIND", DEFAULT_BIND),
            database_url: var("WAYPOINT_DATABASE_URL", DEFAULT_DATABASE_URL),
            upload_dir: PathBuf::from(var("WAYPOINT_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            session_secret,
        }
    }
}
