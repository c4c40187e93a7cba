//! Route definitions for the Fitlog API
//!
//! This module organizes all API routes and applies middleware.

use crate::state::AppState;
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::debug;

mod external;
mod health;
pub mod openapi;
mod users;


pub use external::not_implemented_routes;
pub use users::user_routes;

/// A group of endpoints mounted under the API prefix
pub struct RouteGroup {
    pub name: &'static str,
    /// Mount path relative to the API prefix
    pub path: &'static str,
    pub router: Router<AppState>,
}

/// Every endpoint group the process registers, in mount order
pub fn route_groups() -> Vec<RouteGroup> {
    vec![
        RouteGroup {
            name: "authentication",
            path: "/auth",
            router: not_implemented_routes("authentication"),
        },
        RouteGroup {
            name: "users",
            path: "/users",
            router: user_routes(),
        },
        RouteGroup {
            name: "exercises",
            path: "/exercises",
            router: not_implemented_routes("exercise log"),
        },
        RouteGroup {
            name: "exercise definitions",
            path: "/exercise-definitions",
            router: not_implemented_routes("exercise definition"),
        },
        RouteGroup {
            name: "sync",
            path: "/sync",
            router: not_implemented_routes("sync"),
        },
    ]
}

/// Create the main application router with all middleware
pub fn create_router(state: AppState) -> Router {
    let project = &state.config().project;
    let prefix = project.api_prefix.clone();
    let openapi_path = project.openapi_path();

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route(&openapi_path, get(openapi::openapi_json))
        .nest(&prefix, api_routes())
        // Apply middleware layers
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes under the API prefix
fn api_routes() -> Router<AppState> {
    let mut router = Router::new();

    for group in route_groups() {
        debug!(group = group.name, path = group.path, "Registering route group");
        router = router.nest(group.path, group.router);
    }

    router
}
