//! Error types shared between the store and the API layer

use thiserror::Error;

/// A record failed one of the user-table constraints.
///
/// Raised before a write reaches storage, and also produced by the backend
/// when the database itself rejects a row (NOT NULL, CHECK, length).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} has invalid value '{value}'")]
    InvalidValue { field: String, value: String },

    #[error("{field}: {message}")]
    InvalidFormat { field: String, message: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            Self::Required { field }
            | Self::TooLong { field, .. }
            | Self::InvalidValue { field, .. }
            | Self::InvalidFormat { field, .. } => field,
        }
    }
}
