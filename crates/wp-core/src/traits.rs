//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::geo::BoundingBox;
use crate::models::{Author, Comment, Report, TagCount, TopReport, User};

/// Data persistence contract for reports and their aggregate views.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportRepo: Send + Sync {
    // Report Operations
    async fn insert_report(&self, report: &Report) -> anyhow::Result<()>;
    /// Overwrites every mutable column of an existing report.
    async fn save_report(&self, report: &Report) -> anyhow::Result<()>;
    async fn get_report(&self, id: Uuid) -> anyhow::Result<Option<Report>>;
    async fn get_report_by_slug(&self, slug: &str) -> anyhow::Result<Option<Report>>;
    /// Slugs starting with `base` (case-insensitive), minus the excluded report's.
    async fn slugs_with_prefix(&self, base: &str, exclude: Option<Uuid>) -> anyhow::Result<Vec<String>>;

    // Listing
    async fn list_reports_paginated(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Report>>;
    async fn count_reports(&self) -> anyhow::Result<u64>;
    /// Relevance-ordered full-text search over title and description.
    async fn search_reports(&self, query: &str, limit: i64) -> anyhow::Result<Vec<Report>>;
    /// Coarse spatial prefilter; callers refine by exact distance.
    async fn reports_in_box(&self, bbox: BoundingBox) -> anyhow::Result<Vec<Report>>;
    async fn reports_with_tag(&self, tag: &str) -> anyhow::Result<Vec<Report>>;
    async fn reports_with_any_tag(&self) -> anyhow::Result<Vec<Report>>;
    async fn hearted_reports(&self, user_id: Uuid) -> anyhow::Result<Vec<Report>>;

    // Aggregations
    async fn tag_counts(&self) -> anyhow::Result<Vec<TagCount>>;
    async fn top_reports(&self, min_comments: i64, limit: i64) -> anyhow::Result<Vec<TopReport>>;
}

/// Data persistence contract for comments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn insert_comment(&self, comment: &Comment) -> anyhow::Result<()>;
    /// Oldest first.
    async fn comments_for_report(&self, report_id: Uuid) -> anyhow::Result<Vec<Comment>>;
}

/// Data persistence contract for accounts and their hearts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create_user(&self, user: &User, password_hash: &str) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Returns the user together with the stored password hash.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<(User, String)>>;
    async fn authors(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Author>>;

    /// Set-add; a no-op when already present.
    async fn add_heart(&self, user_id: Uuid, report_id: Uuid) -> anyhow::Result<()>;
    /// Set-remove; a no-op when absent.
    async fn remove_heart(&self, user_id: Uuid, report_id: Uuid) -> anyhow::Result<()>;
}

/// Media storage contract for report photos.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Resizes and saves an image, returning the filename for `Report::photo`.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
}

/// Password and session contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a PHC-format hash for storage
    async fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies a password against a stored hash
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Issues an opaque session token bound to a user
    fn issue_session(&self, user_id: Uuid) -> String;

    /// Returns the user a token was issued for, if the token is genuine
    fn verify_session(&self, token: &str) -> Option<Uuid>;
}
