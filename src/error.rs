//! Error types for the library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flatten validator output into a stable, field-sorted list.
    pub fn from_validation_errors(errors: &ValidationErrors) -> Vec<Self> {
        let mut violations: Vec<Self> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                    Self::new(field.to_string(), message)
                })
            })
            .collect();
        violations.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
        violations
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldViolation>),

    #[error("Duplicate {field}: {value}")]
    DuplicateKey { field: String, value: String },

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn book_not_found(id: impl ToString) -> Self {
        AppError::NotFound {
            resource: "Book",
            id: id.to_string(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(FieldViolation::from_validation_errors(&errors))
    }
}

/// Error envelope: `{success: false, message, error}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub error: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            AppError::Validation(violations) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(serde_json::json!(violations)),
            ),
            AppError::DuplicateKey { field, value } => (
                StatusCode::BAD_REQUEST,
                format!("{} already exists", field.to_uppercase()),
                Some(serde_json::json!(format!("Duplicate value for {}: {}", field, value))),
            ),
            AppError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                format!("{} not found", resource),
                Some(serde_json::json!(format!(
                    "No {} found with the provided ID ({})",
                    resource.to_lowercase(),
                    id
                ))),
            ),
            AppError::InsufficientStock {
                available,
                requested,
            } => (
                StatusCode::BAD_REQUEST,
                "Insufficient copies available".to_string(),
                Some(serde_json::json!(format!(
                    "Only {} copies available, but {} requested",
                    available, requested
                ))),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                "Request timeout".to_string(),
                None,
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
