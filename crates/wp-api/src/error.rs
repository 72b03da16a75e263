//! Maps `AppError` onto HTTP status codes and a JSON `{"error": ...}` body.

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use wp_core::error::AppError;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Client-facing message. Internal details stay in the log.
    fn message(&self) -> String {
        match &self.0 {
            AppError::NotFound(kind, id) => format!("{kind} {id} not found"),
            AppError::ValidationError(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Internal(_) => "Something went wrong".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = &self.0 {
            log::error!("request failed: {detail}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.message() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::not_found("Report", "x"), StatusCode::NOT_FOUND),
            (AppError::ValidationError("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("who".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::Internal("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ApiError(AppError::Internal("sqlite: database is locked".into()));
        assert_eq!(err.message(), "Something went wrong");
        assert_eq!(ApiError(AppError::ValidationError("You must supply a title!".into())).message(), "You must supply a title!");
    }
}
