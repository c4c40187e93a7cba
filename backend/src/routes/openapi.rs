//! OpenAPI document for the HTTP surface
//!
//! Paths are declared relative to the API prefix; the prefix itself is the
//! document's server URL, so the same document is valid for any prefix.

use super::users;
use crate::config::ProjectConfig;
use crate::state::AppState;
use axum::{extract::State, Json};
use fitlog_shared::{
    ActivityLevel, CreateUserRequest, DeletedUserResponse, ErrorDetail, ErrorResponse, Gender,
    UpdateUserRequest, UserPage, UserResponse, WorkoutRoutineResponse,
};
use utoipa::openapi::{server::Server, OpenApi as OpenApiDoc};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        users::create_user,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::list_user_routines,
    ),
    components(schemas(
        CreateUserRequest,
        UpdateUserRequest,
        UserResponse,
        UserPage,
        DeletedUserResponse,
        WorkoutRoutineResponse,
        Gender,
        ActivityLevel,
        ErrorResponse,
        ErrorDetail,
    )),
    tags((name = "Users", description = "User profile records"))
)]
pub struct ApiDoc;

/// Build the document for a project: title from the project name, server
/// URL from the API prefix.
pub fn document(project: &ProjectConfig) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    doc.info.title = project.name.clone();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.servers = Some(vec![Server::new(project.api_prefix.clone())]);
    doc
}

/// GET {api_prefix}/openapi.json
pub async fn openapi_json(State(state): State<AppState>) -> Json<OpenApiDoc> {
    Json(document(&state.config().project))
}
