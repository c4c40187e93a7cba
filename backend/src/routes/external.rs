//! Route groups whose handlers live in other services
//!
//! They are mounted so the API surface is complete, and answer
//! `501 Not Implemented` on every method and sub-path.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{routing::any, Router};

/// Router that rejects every request with `501`, naming the group
pub fn not_implemented_routes(group: &'static str) -> Router<AppState> {
    let handler = move || async move { ApiError::NotImplemented(group) };

    Router::new()
        .route("/", any(handler))
        .route("/*rest", any(handler))
}
