//! Cookie-backed sessions. The cookie carries a token minted by the
//! configured `AuthProvider`; handlers that need a login take `CurrentUser`.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use uuid::Uuid;
use wp_core::error::AppError;

use crate::error::ApiError;
use crate::handlers::AppState;

pub const SESSION_COOKIE: &str = "waypoint_session";

/// The logged-in user's id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentUser(pub Uuid);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(current_user(req))
    }
}

fn current_user(req: &HttpRequest) -> Result<CurrentUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not registered".into()))?;

    req.cookie(SESSION_COOKIE)
        .and_then(|cookie| state.auth.verify_session(cookie.value()))
        .map(CurrentUser)
        .ok_or_else(|| AppError::Unauthorized("You must be logged in to do that!".into()).into())
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}
