//! Comments and the author resolution step applied to them on every read.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use wp_core::error::{AppError, Result};
use wp_core::models::{Author, Comment, CommentDraft, CommentView};
use wp_core::traits::{CommentRepo, ReportRepo, UserRepo};

#[derive(Clone)]
pub struct CommentManager {
    reports: Arc<dyn ReportRepo>,
    comments: Arc<dyn CommentRepo>,
    users: Arc<dyn UserRepo>,
}

impl CommentManager {
    pub fn new(reports: Arc<dyn ReportRepo>, comments: Arc<dyn CommentRepo>, users: Arc<dyn UserRepo>) -> Self {
        Self { reports, comments, users }
    }

    pub async fn add_comment(&self, report_id: Uuid, author_id: Uuid, draft: CommentDraft) -> Result<CommentView> {
        let draft = draft.validate()?;
        if self.reports.get_report(report_id).await?.is_none() {
            return Err(AppError::not_found("Report", report_id));
        }
        let author = resolve_author(self.users.as_ref(), author_id).await?;

        let comment = Comment {
            id: Uuid::now_v7(),
            created: Utc::now(),
            author: author_id,
            report: report_id,
            text: draft.text,
            rating: draft.rating,
        };
        self.comments.insert_comment(&comment).await?;

        Ok(CommentView::resolve(comment, author))
    }
}

pub(crate) async fn resolve_author(users: &dyn UserRepo, id: Uuid) -> Result<Author> {
    users
        .authors(&[id])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found("User", id))
}

/// Attaches authors to comments with a single lookup.
pub(crate) async fn resolve_comments(users: &dyn UserRepo, comments: Vec<Comment>) -> Result<Vec<CommentView>> {
    if comments.is_empty() {
        return Ok(vec![]);
    }

    let mut ids: Vec<Uuid> = comments.iter().map(|c| c.author).collect();
    ids.sort();
    ids.dedup();
    let authors: HashMap<Uuid, Author> = users.authors(&ids).await?.into_iter().map(|a| (a.id, a)).collect();

    comments
        .into_iter()
        .map(|c| {
            let author = authors
                .get(&c.author)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("comment {} has a dangling author {}", c.id, c.author)))?;
            Ok(CommentView::resolve(c, author))
        })
        .collect()
}
