//! Application error handling
//!
//! This module provides unified error handling for the API,
//! converting store and validation errors to HTTP responses.

use crate::repositories::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fitlog_shared::{ErrorDetail, ErrorResponse, ValidationError};
use thiserror::Error;
use tracing::error;

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {field} is already in use")]
    Conflict { field: String },

    /// Body is not JSON or does not fit the request schema
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Storage error")]
    Store(#[source] StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => ApiError::Conflict { field },
            StoreError::Validation(v) => ApiError::Validation(v),
            StoreError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} {} not found", entity, id))
            }
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                err.to_string(),
                Some(err.field().to_string()),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            ApiError::Conflict { field } => (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("{} is already in use", field),
                Some(field.clone()),
            ),
            ApiError::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                "INVALID_BODY",
                rejection.body_text(),
                None,
            ),
            ApiError::NotImplemented(group) => (
                StatusCode::NOT_IMPLEMENTED,
                "NOT_IMPLEMENTED",
                format!("The {} endpoints are served by another service", group),
                None,
            ),
            ApiError::Store(err) => {
                error!("Store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
