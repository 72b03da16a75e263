//! # Domain Models
//!
//! These structs represent the core entities of Waypoint.
//! We use UUID v7 for time-ordered, globally unique identification.
//! Field names on the wire follow the document-store layout the JSON API
//! has always exposed (`_id`, GeoJSON `location`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::geo::GeoPoint;

/// GeoJSON geometry type. Reports only ever carry points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoKind {
    #[default]
    Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type", default)]
    pub kind: GeoKind,
    /// `[longitude, latitude]`, GeoJSON order.
    pub coordinates: [f64; 2],
    pub address: String,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.coordinates[0], self.coordinates[1])
    }
}

/// A place somebody reported, e.g. a café or a viewpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    /// The URL slug (e.g., "sunset-point-2")
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub location: Location,
    /// Filename handled by MediaStore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub author: Uuid,
}

/// User-submitted fields of a report, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDraft {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub lng: f64,
    pub lat: f64,
    pub address: String,
    pub photo: Option<String>,
}

impl ReportDraft {
    /// Trims every text field and rejects drafts missing a title, an address
    /// or sane coordinates. Tags become a set, keeping first-seen order.
    pub fn validate(self) -> Result<ReportDraft> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::ValidationError("Please enter a report title".into()));
        }

        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(AppError::ValidationError("You must supply an address!".into()));
        }

        if !self.lng.is_finite() || !self.lat.is_finite() {
            return Err(AppError::ValidationError("You must supply coordinates!".into()));
        }
        if !(-180.0..=180.0).contains(&self.lng) || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::ValidationError(format!(
                "coordinates [{}, {}] are out of range",
                self.lng, self.lat
            )));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        let photo = self.photo.filter(|p| !p.is_empty());

        Ok(ReportDraft { title, description, tags, lng: self.lng, lat: self.lat, address, photo })
    }

    pub fn location(&self) -> Location {
        Location {
            kind: GeoKind::Point,
            coordinates: [self.lng, self.lat],
            address: self.address.clone(),
        }
    }
}

/// The projection returned by the map endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPin {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl From<Report> for ReportPin {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            slug: r.slug,
            title: r.title,
            description: r.description,
            location: r.location,
            photo: r.photo,
        }
    }
}

/// A registered account. The password hash lives beside it in storage
/// and never leaves the repository layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created: DateTime<Utc>,
    /// Reports this user has hearted
    pub hearts: Vec<Uuid>,
}

impl User {
    pub fn has_heart(&self, report_id: Uuid) -> bool {
        self.hearts.contains(&report_id)
    }
}

/// The public face of a user, attached to reports and comments on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

impl From<&User> for Author {
    fn from(u: &User) -> Self {
        Self { id: u.id, name: u.name.clone() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

impl Registration {
    pub fn validate(self) -> Result<Registration> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("You must supply a name!".into()));
        }
        let email = self.email.trim().to_lowercase();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AppError::ValidationError("That Email is not valid!".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::ValidationError("Password cannot be blank!".into()));
        }
        if self.password != self.confirm {
            return Err(AppError::ValidationError("Oops! Your passwords do not match".into()));
        }
        Ok(Registration { name, email, password: self.password, confirm: self.confirm })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub author: Uuid,
    pub report: Uuid,
    pub text: String,
    /// 1 to 5 stars, optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentDraft {
    pub text: String,
    pub rating: Option<i64>,
}

impl CommentDraft {
    pub fn validate(self) -> Result<CommentDraft> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::ValidationError("Your comment must have text!".into()));
        }
        if let Some(rating) = self.rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(AppError::ValidationError(format!(
                    "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
                )));
            }
        }
        Ok(CommentDraft { text, rating: self.rating })
    }
}

/// A comment with its author resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub author: Author,
    pub report: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

impl CommentView {
    pub fn resolve(comment: Comment, author: Author) -> Self {
        Self {
            id: comment.id,
            created: comment.created,
            author,
            report: comment.report,
            text: comment.text,
            rating: comment.rating,
        }
    }
}

/// A report with its author and comments resolved, as shown on its own page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDetail {
    pub report: Report,
    pub author: Author,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    #[serde(rename = "_id")]
    pub tag: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopReport {
    #[serde(flatten)]
    pub report: Report,
    pub comment_count: i64,
    /// Mean of the rated comments; absent when none carries a rating
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub reports: Vec<Report>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

/// Outcome of a paginated listing. An empty page past the end is reported
/// explicitly so the caller can redirect instead of rendering nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportListing {
    Page(ReportPage),
    OutOfRange { requested: u32, target_page: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub tags: Vec<TagCount>,
    pub reports: Vec<Report>,
}
