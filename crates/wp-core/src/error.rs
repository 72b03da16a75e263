//! # AppError
//!
//! Centralized error handling for the Waypoint ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all wp-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Report, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., missing title, rating out of range)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Not logged in, or credentials did not match
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Logged in, but not the owner of the resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate email)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), id.to_string())
    }
}

/// Port failures are opaque to callers, unless the port raised an
/// `AppError` itself (e.g. a media store rejecting an undecodable upload).
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(err) => AppError::Internal(format!("{err:#}")),
        }
    }
}

/// A specialized Result type for Waypoint logic.
pub type Result<T> = std::result::Result<T, AppError>;
