use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not enrolled: {0}")]
    NotEnrolled(String),

    #[error("Quiz is not open yet: {0}")]
    NotYetOpen(String),

    #[error("Quiz is closed: {0}")]
    Closed(String),

    #[error("Already enrolled: {0}")]
    AlreadyEnrolled(String),

    #[error("Already attempted: {0}")]
    AlreadyAttempted(String),

    #[error("Attempt already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Store or identity collaborator timed out or is down. Retryable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotEnrolled(_) => "NOT_ENROLLED",
            AppError::NotYetOpen(_) => "NOT_YET_OPEN",
            AppError::Closed(_) => "CLOSED",
            AppError::AlreadyEnrolled(_) => "ALREADY_ENROLLED",
            AppError::AlreadyAttempted(_) => "ALREADY_ATTEMPTED",
            AppError::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            AppError::Locked(_) => "LOCKED",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Unavailable(_) => "UNAVAILABLE",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::PermissionDenied(_)
            | AppError::Forbidden(_)
            | AppError::NotEnrolled(_)
            | AppError::NotYetOpen(_)
            | AppError::Closed(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyEnrolled(_)
            | AppError::AlreadyAttempted(_)
            | AppError::AlreadyFinalized(_)
            | AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Locked(_) => StatusCode::LOCKED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::InternalError(msg) = self {
            log::error!("Internal error: {}", msg);
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.error_code(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Unavailable(format!("Database error: {}", err))
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::Unavailable("Storage call timed out".to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
