//! # wp-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the services.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpResponse};
use uuid::Uuid;
use wp_core::error::AppError;
use wp_core::models::ReportListing;
use wp_core::traits::{AuthProvider, MediaStore};
use wp_services::queries::DEFAULT_NEAR_DISTANCE_M;
use wp_services::Services;

use crate::error::ApiError;
use crate::forms::{CommentForm, LoginForm, NearQuery, RegisterForm, ReportForm, SearchQuery, UploadedPhoto};
use crate::session::{removal_cookie, session_cookie, CurrentUser};

type HandlerResult = Result<HttpResponse, ApiError>;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub services: Services,
    pub store: Arc<dyn MediaStore>,
    pub auth: Arc<dyn AuthProvider>,
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

async fn store_photo(data: &AppState, photo: Option<UploadedPhoto>) -> Result<Option<String>, ApiError> {
    match photo {
        Some(photo) => {
            let name = data
                .store
                .save_upload(photo.data, &photo.content_type)
                .await
                .map_err(AppError::from)?;
            Ok(Some(name))
        }
        None => Ok(None),
    }
}

// --- Accounts ---

pub async fn register(data: web::Data<AppState>, form: web::Form<RegisterForm>) -> HandlerResult {
    let user = data.services.accounts.register(form.into_inner().into()).await?;
    Ok(HttpResponse::SeeOther()
        .cookie(session_cookie(data.auth.issue_session(user.id)))
        .insert_header((header::LOCATION, "/"))
        .finish())
}

pub async fn login(data: web::Data<AppState>, form: web::Form<LoginForm>) -> HandlerResult {
    let user = data.services.accounts.login(&form.email, &form.password).await?;
    log::info!("user {} logged in", user.id);
    Ok(HttpResponse::SeeOther()
        .cookie(session_cookie(data.auth.issue_session(user.id)))
        .insert_header((header::LOCATION, "/"))
        .finish())
}

pub async fn logout() -> HttpResponse {
    HttpResponse::SeeOther()
        .cookie(removal_cookie())
        .insert_header((header::LOCATION, "/"))
        .finish()
}

// --- Reports ---

async fn listing(data: &AppState, page: u32) -> HandlerResult {
    match data.services.queries.list_reports(page).await? {
        ReportListing::Page(page) => Ok(HttpResponse::Ok().json(page)),
        ReportListing::OutOfRange { requested, target_page } => {
            log::info!("page {requested} does not exist, redirecting to page {target_page}");
            Ok(see_other(&format!("/reports/page/{target_page}")))
        }
    }
}

/// `/` and `/reports`
pub async fn index(data: web::Data<AppState>) -> HandlerResult {
    listing(&data, 1).await
}

/// `/reports/page/{page}`
pub async fn reports_page(data: web::Data<AppState>, path: web::Path<u32>) -> HandlerResult {
    listing(&data, path.into_inner()).await
}

/// Multipart create; redirects to the new report's page.
pub async fn create_report(data: web::Data<AppState>, user: CurrentUser, payload: Multipart) -> HandlerResult {
    let (draft, photo) = ReportForm::from_multipart(payload).await?.into_draft()?;
    // Bad drafts are rejected before the photo is resized and written.
    let mut draft = draft.validate()?;
    draft.photo = store_photo(&data, photo).await?;

    let report = data.services.reports.create(draft, user.0).await?;
    Ok(see_other(&format!("/report/{}", report.slug)))
}

/// Multipart update; redirects back to the edit page.
pub async fn update_report(
    data: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> HandlerResult {
    let id = path.into_inner();
    let (draft, photo) = ReportForm::from_multipart(payload).await?.into_draft()?;
    // Ownership and the draft are checked before anything touches the disk.
    data.services.reports.edit(id, user.0).await?;
    let mut draft = draft.validate()?;
    draft.photo = store_photo(&data, photo).await?;

    let report = data.services.reports.update(id, draft, user.0).await?;
    Ok(see_other(&format!("/reports/{}/edit", report.id)))
}

pub async fn edit_report(data: web::Data<AppState>, user: CurrentUser, path: web::Path<Uuid>) -> HandlerResult {
    let report = data.services.reports.edit(path.into_inner(), user.0).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn report_by_slug(data: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let detail = data.services.reports.detail_by_slug(&path).await?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn tags(data: web::Data<AppState>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(data.services.queries.reports_by_tag(None).await?))
}

pub async fn tag(data: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(data.services.queries.reports_by_tag(Some(path.as_str())).await?))
}

pub async fn hearts(data: web::Data<AppState>, user: CurrentUser) -> HandlerResult {
    Ok(HttpResponse::Ok().json(data.services.queries.hearted_reports(user.0).await?))
}

pub async fn top(data: web::Data<AppState>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(data.services.reports.top_reports().await?))
}

pub async fn add_comment(
    data: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    form: web::Form<CommentForm>,
) -> HandlerResult {
    let draft = form.into_inner().into_draft()?;
    let comment = data.services.comments.add_comment(path.into_inner(), user.0, draft).await?;
    Ok(HttpResponse::Created().json(comment))
}

// --- JSON API ---

/// `GET /api/search?q=`
pub async fn search(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(data.services.queries.search(&query.q).await?))
}

/// `GET /api/reports/near?lng=&lat=`
pub async fn near(data: web::Data<AppState>, query: web::Query<NearQuery>) -> HandlerResult {
    let (lng, lat) = query.point()?;
    let pins = data.services.queries.reports_near(lng, lat, DEFAULT_NEAR_DISTANCE_M).await?;
    Ok(HttpResponse::Ok().json(pins))
}

/// `POST /api/reports/{id}/heart`, returns the updated user.
pub async fn heart(data: web::Data<AppState>, user: CurrentUser, path: web::Path<Uuid>) -> HandlerResult {
    let user = data.services.hearts.toggle(user.0, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}
