//! Command/query gateway library.

pub mod admin;
pub mod auth;
pub mod cache;
pub mod commands;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod queries;
pub mod resilience;
pub mod routes;
pub mod storage;
pub mod validation;

pub use config::schema::GatewayConfig;
pub use http::{AppState, GatewayServer};
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
