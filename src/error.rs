//! Typed errors and HTTP mapping.

use crate::response::{failure, ErrorEntry};
use crate::service::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: resource {resource} column {column}")]
    InvalidPrimaryKey { resource: String, column: String },
    #[error("resource {0} declares no primary key")]
    EmptyPrimaryKey(String),
    #[error("search field {resource}.{field} is not a string field")]
    InvalidSearchField { resource: String, field: String },
    #[error("invalid order '{value}' on resource {resource}")]
    InvalidOrder { resource: String, value: String },
    #[error("duplicate field {resource}.{field}")]
    DuplicateField { resource: String, field: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("environment variable {var}: {message}")]
    Env { var: String, message: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures reported by a store driver. Drivers must keep these three outcomes apart.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("no row matches the key")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    Unique(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("store unavailable: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Not Found")]
    NotFound,
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("store: {0}")]
    Store(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound,
            StoreError::Unique(detail) => AppError::Conflict(detail),
            StoreError::Constraint(detail) => AppError::BadRequest(detail),
            StoreError::Transport(detail) => AppError::Store(detail),
        }
    }
}

impl From<Vec<FieldError>> for AppError {
    fn from(errors: Vec<FieldError>) -> Self {
        AppError::Validation(errors)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Envelope error entries for this failure.
    pub fn entries(&self) -> Vec<ErrorEntry> {
        match self {
            AppError::Validation(errors) => errors.iter().map(ErrorEntry::from).collect(),
            AppError::NotFound => vec![ErrorEntry::new("not_found", self.to_string())],
            AppError::Config(_) => vec![ErrorEntry::new("config_error", self.to_string())],
            AppError::Conflict(_) => vec![ErrorEntry::new("conflict", self.to_string())],
            AppError::BadRequest(_) => vec![ErrorEntry::new("bad_request", self.to_string())],
            AppError::Store(_) => vec![ErrorEntry::new("store_error", self.to_string())],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        failure(status, self.entries())
    }
}
