//! User profile API routes

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use fitlog_shared::{
    CreateUserRequest, DeletedUserResponse, NewUser, PaginatedResponse, Pagination,
    UpdateUserRequest, UserChanges, UserResponse, WorkoutRoutineResponse,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
        .route("/:id/routines", get(list_user_routines))
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size, clamped to 1..=100
    pub per_page: Option<u32>,
    /// Exact email lookup; returns at most one user
    pub email: Option<String>,
}

impl ListUsersQuery {
    fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// POST /users - Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Malformed body, missing or invalid field", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let Json(req) = body?;
    let new_user = NewUser::try_from(req)?;
    let user = state.store().create_user(new_user).await?;

    info!(user_id = user.id, "User created");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users - List users, or look one up by email
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = UserPage),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<PaginatedResponse<UserResponse>>> {
    let pagination = query.pagination();

    if let Some(email) = query.email.as_deref() {
        let found: Vec<UserResponse> = state
            .store()
            .find_user_by_email(email)
            .await?
            .into_iter()
            .map(UserResponse::from)
            .collect();
        let total = found.len() as u64;
        return Ok(Json(PaginatedResponse::new(found, total, &pagination)));
    }

    let (users, total) = state
        .store()
        .list_users(pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total,
        &pagination,
    )))
}

/// GET /users/{id} - Fetch a user
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .store()
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", id)))?;

    Ok(Json(user.into()))
}

/// PATCH /users/{id} - Partially update a user
///
/// Absent keys are left alone; an explicit `null` clears a nullable field.
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid field", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = body?;
    let changes = UserChanges::try_from(req)?.touched_at(Utc::now());
    let user = state.store().update_user(id, changes).await?;

    info!(user_id = user.id, "User updated");

    Ok(Json(user.into()))
}

/// DELETE /users/{id} - Delete a user and its refresh tokens
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = DeletedUserResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<DeletedUserResponse>> {
    let deleted = state.store().delete_user(id).await?;

    info!(
        user_id = deleted.id,
        refresh_tokens_removed = deleted.refresh_tokens_removed,
        routines_detached = deleted.routines_detached,
        "User deleted"
    );

    Ok(Json(DeletedUserResponse {
        id: deleted.id,
        refresh_tokens_removed: deleted.refresh_tokens_removed,
        routines_detached: deleted.routines_detached,
    }))
}

/// GET /users/{id}/routines - Routines still attached to a user
#[utoipa::path(
    get,
    path = "/users/{id}/routines",
    tag = "Users",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Routines owned by the user", body = [WorkoutRoutineResponse]),
        (status = 404, description = "No such user", body = ErrorResponse),
    )
)]
pub async fn list_user_routines(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<WorkoutRoutineResponse>>> {
    let store = state.store();
    if store.get_user(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user {} not found", id)));
    }

    let routines = store.routines_for_user(id).await?;

    Ok(Json(
        routines
            .into_iter()
            .map(WorkoutRoutineResponse::from)
            .collect(),
    ))
}
