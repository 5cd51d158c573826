use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cwa_map_core::error::CoreError;
use cwa_map_core::types::Timestamp;
use cwa_map_db::repositories::SaveCenterError;
use cwa_map_geocoding::GeocodeError;
use cwa_map_notify::NotifyError;
use serde::Serialize;
use validator::ValidationErrors;

/// Message sent instead of the details of any 5xx error.
const INTERNAL_MESSAGE: &str = "internal server error";

/// Application-level error type for HTTP handlers.
///
/// Wraps the error types of the lower crates and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce the JSON error envelope
/// `{timestamp, message}`, extended with `errors` for validation failures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `cwa_map_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// Request body failed field validation.
    #[error("validation error")]
    Validation(Vec<FieldError>),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub validation: String,
}

impl From<SaveCenterError> for AppError {
    fn from(err: SaveCenterError) -> Self {
        match err {
            SaveCenterError::Core(e) => Self::Core(e),
            SaveCenterError::Database(e) => Self::Database(e),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(field_errors(&errors, None))
    }
}

/// Flatten field-level validation errors, sorted by field name.
///
/// With a `prefix` each field is reported as `prefix.field`.
pub fn field_errors(errors: &ValidationErrors, prefix: Option<&str>) -> Vec<FieldError> {
    let mut result: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = match prefix {
                Some(prefix) => format!("{prefix}.{field}"),
                None => field.to_string(),
            };
            errs.iter().map(move |e| FieldError {
                field: field.clone(),
                validation: e.code.to_string(),
            })
        })
        .collect();
    result.sort_by(|a, b| a.field.cmp(&b.field).then(a.validation.cmp(&b.validation)));
    result
}

#[derive(Serialize)]
struct ErrorBody {
    timestamp: Timestamp,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "validation error".to_string(),
                Some(errors),
            ),
            other => {
                let (status, message) = other.classify();
                (status, message, None)
            }
        };

        let body = ErrorBody {
            timestamp: chrono::Utc::now(),
            message,
            errors,
        };
        (status, axum::Json(body)).into_response()
    }
}

impl AppError {
    fn classify(&self) -> (StatusCode, String) {
        match self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Geocode(err) => classify_geocode_error(err),
            AppError::Notify(err) => match err {
                NotifyError::Core(core) => classify_core_error(core),
                NotifyError::Database(db) => classify_sqlx_error(db),
                other => internal(other),
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation error".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        }
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, String) {
    match err {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        CoreError::DuplicateUserReference(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        CoreError::Configuration(_) | CoreError::Internal(_) => internal(err),
    }
}

/// `RowNotFound` maps to 404; everything else is a sanitized 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "record not found".to_string()),
        other => internal(other),
    }
}

/// Address problems are the caller's fault; provider failures are not.
fn classify_geocode_error(err: &GeocodeError) -> (StatusCode, String) {
    if err.is_address_problem() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else {
        internal(err)
    }
}

fn internal(err: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_MESSAGE.to_string(),
    )
}
