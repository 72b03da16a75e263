//! Report lifecycle: creation, ownership-checked updates, slug assignment,
//! the resolved detail view and the aggregate views over all reports.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use wp_core::error::{AppError, Result};
use wp_core::models::{Report, ReportDetail, ReportDraft, TagCount, TopReport};
use wp_core::slug::{assign_slug, slugify};
use wp_core::traits::{CommentRepo, ReportRepo, UserRepo};

use crate::comments::{resolve_author, resolve_comments};

/// Reports need at least this many comments to be ranked.
pub const TOP_REPORTS_MIN_COMMENTS: i64 = 2;
pub const TOP_REPORTS_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct ReportManager {
    reports: Arc<dyn ReportRepo>,
    comments: Arc<dyn CommentRepo>,
    users: Arc<dyn UserRepo>,
}

impl ReportManager {
    pub fn new(reports: Arc<dyn ReportRepo>, comments: Arc<dyn CommentRepo>, users: Arc<dyn UserRepo>) -> Self {
        Self { reports, comments, users }
    }

    pub async fn create(&self, draft: ReportDraft, author_id: Uuid) -> Result<Report> {
        let draft = draft.validate()?;
        if self.users.get_user(author_id).await?.is_none() {
            return Err(AppError::ValidationError("You must supply an author".into()));
        }

        let slug = self.next_slug(&draft.title, None).await?;
        let report = Report {
            id: Uuid::now_v7(),
            location: draft.location(),
            title: draft.title,
            slug,
            description: draft.description,
            tags: draft.tags,
            created: Utc::now(),
            photo: draft.photo,
            author: author_id,
        };

        self.reports.insert_report(&report).await?;
        log::info!("report {} created as /report/{}", report.id, report.slug);
        Ok(report)
    }

    /// Applies `draft` to a report the requester owns. The slug only moves
    /// when the title does; a draft without a photo keeps the current one.
    pub async fn update(&self, id: Uuid, draft: ReportDraft, requester_id: Uuid) -> Result<Report> {
        let mut report = self.edit(id, requester_id).await?;
        let draft = draft.validate()?;

        if draft.title != report.title {
            report.slug = self.next_slug(&draft.title, Some(report.id)).await?;
        }
        report.location = draft.location();
        report.title = draft.title;
        report.description = draft.description;
        report.tags = draft.tags;
        if draft.photo.is_some() {
            report.photo = draft.photo;
        }

        self.reports.save_report(&report).await?;
        log::info!("report {} updated", report.id);
        Ok(report)
    }

    /// Loads a report for editing, enforcing ownership.
    pub async fn edit(&self, id: Uuid, requester_id: Uuid) -> Result<Report> {
        let report = self
            .reports
            .get_report(id)
            .await?
            .ok_or_else(|| AppError::not_found("Report", id))?;

        if report.author != requester_id {
            log::warn!("user {} tried to edit report {} owned by {}", requester_id, id, report.author);
            return Err(AppError::Forbidden("You must own a report in order to edit it!".into()));
        }
        Ok(report)
    }

    pub async fn detail_by_slug(&self, slug: &str) -> Result<ReportDetail> {
        let report = self
            .reports
            .get_report_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Report", slug))?;

        let comments = self.comments.comments_for_report(report.id).await?;
        let author = resolve_author(self.users.as_ref(), report.author).await?;
        let comments = resolve_comments(self.users.as_ref(), comments).await?;

        Ok(ReportDetail { report, author, comments })
    }

    pub async fn tags_list(&self) -> Result<Vec<TagCount>> {
        Ok(self.reports.tag_counts().await?)
    }

    pub async fn top_reports(&self) -> Result<Vec<TopReport>> {
        Ok(self.reports.top_reports(TOP_REPORTS_MIN_COMMENTS, TOP_REPORTS_LIMIT).await?)
    }

    async fn next_slug(&self, title: &str, exclude: Option<Uuid>) -> Result<String> {
        let base = slugify(title);
        let existing = self.reports.slugs_with_prefix(&base, exclude).await?;
        let slug = assign_slug(&base, &existing).map_err(|e| AppError::Internal(e.to_string()))?;
        log::debug!("slug {:?} -> {:?} ({} candidates)", title, slug, existing.len());
        Ok(slug)
    }
}
