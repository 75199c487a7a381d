//! Operator endpoints behind a bearer API key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/cache", get(get_cache))
        .route("/admin/cache/{*key}", delete(delete_cache_entry))
        .route("/admin/dispatch", get(get_dispatch))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
