//! Route table.
//!
//! Handlers only pick a pipeline entry point, a storage call and a cache
//! policy; everything else happens in the pipeline.

pub mod operations;
pub mod remarks;
pub mod statistics;
pub mod users;

use axum::Router;

use crate::http::server::AppState;
use crate::queries::FilterRegistry;
use crate::validation::ValidatorRegistry;

/// Storage payloads are passed through untyped.
pub type Document = serde_json::Value;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(remarks::router())
        .merge(users::router())
        .merge(statistics::router())
        .merge(operations::router())
}

/// Validators for the commands these routes accept.
pub fn validators() -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::new();
    remarks::register_validators(&mut registry);
    registry
}

/// Post-fetch filters for these routes. None are registered yet, so every
/// pair resolves to the identity filter.
pub fn filters() -> FilterRegistry {
    FilterRegistry::new()
}
