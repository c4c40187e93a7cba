//! Store error kinds
//!
//! Constraint violations surface as distinct variants so callers can tell a
//! duplicate email from a malformed record from a broken connection.

use crate::schema::column_for_constraint;
use fitlog_shared::ValidationError;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

// Postgres SQLSTATE codes the store translates
const UNIQUE_VIOLATION: &str = "23505";
const NOT_NULL_VIOLATION: &str = "23502";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique column already holds this value
    #[error("{field} is already in use")]
    Conflict { field: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("store is closed")]
    Closed,

    #[error("database error")]
    Database(#[source] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn conflict(field: impl Into<String>) -> Self {
        Self::Conflict {
            field: field.into(),
        }
    }

    /// A referenced parent row does not exist
    pub fn missing_parent(field: impl Into<String>) -> Self {
        ValidationError::invalid_format(field, "references a missing record").into()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let classified = err.as_database_error().and_then(|db_err| {
            let field = db_err
                .constraint()
                .and_then(column_for_constraint)
                .map(str::to_string)
                .or_else(|| {
                    db_err
                        .try_downcast_ref::<PgDatabaseError>()
                        .and_then(|pg| pg.column())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "unknown".to_string());

            let code = db_err.code()?;
            match &*code {
                UNIQUE_VIOLATION => Some(StoreError::conflict(field)),
                NOT_NULL_VIOLATION => Some(ValidationError::required(field).into()),
                FOREIGN_KEY_VIOLATION => Some(StoreError::missing_parent(field)),
                CHECK_VIOLATION | STRING_DATA_RIGHT_TRUNCATION | INVALID_TEXT_REPRESENTATION => {
                    Some(ValidationError::invalid_format(field, db_err.message()).into())
                }
                _ => None,
            }
        });

        match classified {
            Some(store_err) => store_err,
            None => StoreError::Database(err),
        }
    }
}
