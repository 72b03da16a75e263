//! Read-side queries: pagination, search, the map and tag filters.

use std::sync::Arc;

use futures_util::try_join;
use uuid::Uuid;
use wp_core::error::{AppError, Result};
use wp_core::geo::{BoundingBox, GeoPoint};
use wp_core::models::{Report, ReportListing, ReportPage, ReportPin, TagListing};
use wp_core::traits::ReportRepo;

pub const PAGE_SIZE: u32 = 9;
pub const SEARCH_LIMIT: i64 = 5;
pub const NEAR_LIMIT: usize = 10;
/// 10km
pub const DEFAULT_NEAR_DISTANCE_M: f64 = 10_000.0;

#[derive(Clone)]
pub struct QueryService {
    reports: Arc<dyn ReportRepo>,
}

impl QueryService {
    pub fn new(reports: Arc<dyn ReportRepo>) -> Self {
        Self { reports }
    }

    /// Newest reports first, `PAGE_SIZE` per page. Pages start at 1; 0 is
    /// read as 1.
    pub async fn list_reports(&self, page: u32) -> Result<ReportListing> {
        self.list_reports_sized(page, PAGE_SIZE).await
    }

    pub async fn list_reports_sized(&self, page: u32, page_size: u32) -> Result<ReportListing> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let limit = i64::from(page_size);
        let skip = i64::from(page).saturating_mul(limit).saturating_sub(limit);

        let (reports, count) = try_join!(
            self.reports.list_reports_paginated(limit, skip),
            self.reports.count_reports(),
        )?;
        let total_pages = count.div_ceil(u64::from(page_size)) as u32;

        if reports.is_empty() && skip > 0 {
            return Ok(ReportListing::OutOfRange { requested: page, target_page: total_pages.max(1) });
        }

        Ok(ReportListing::Page(ReportPage { reports, page, total_pages, total_count: count }))
    }

    /// Up to five reports, most relevant first.
    pub async fn search(&self, query: &str) -> Result<Vec<Report>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.reports.search_reports(query, SEARCH_LIMIT).await?)
    }

    /// Up to ten pins within `max_distance_m` of the point, nearest first.
    pub async fn reports_near(&self, lng: f64, lat: f64, max_distance_m: f64) -> Result<Vec<ReportPin>> {
        if !lng.is_finite() || !lat.is_finite() || !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::ValidationError(format!("invalid point [{lng}, {lat}]")));
        }
        if !max_distance_m.is_finite() || max_distance_m < 0.0 {
            return Err(AppError::ValidationError(format!("invalid distance {max_distance_m}")));
        }

        let center = GeoPoint::new(lng, lat);
        let candidates = self.reports.reports_in_box(BoundingBox::around(center, max_distance_m)).await?;

        let mut nearby: Vec<(f64, Report)> = candidates
            .into_iter()
            .map(|r| (center.distance_m(&r.location.point()), r))
            .filter(|(d, _)| *d <= max_distance_m)
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(nearby.into_iter().take(NEAR_LIMIT).map(|(_, r)| r.into()).collect())
    }

    /// Reports with `tag`, or with any tag at all, plus every tag's count.
    pub async fn reports_by_tag(&self, tag: Option<&str>) -> Result<TagListing> {
        let tag = tag.map(str::trim).filter(|t| !t.is_empty());
        let reports = async {
            match tag {
                Some(t) => self.reports.reports_with_tag(t).await,
                None => self.reports.reports_with_any_tag().await,
            }
        };
        let (tags, reports) = try_join!(self.reports.tag_counts(), reports)?;

        Ok(TagListing { tag: tag.map(String::from), tags, reports })
    }

    pub async fn hearted_reports(&self, user_id: Uuid) -> Result<Vec<Report>> {
        Ok(self.reports.hearted_reports(user_id).await?)
    }
}
