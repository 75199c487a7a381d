use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub await_outcome: bool,
}

#[derive(Serialize)]
pub struct CacheSummary {
    pub entries: usize,
}

#[derive(Serialize)]
pub struct DispatchSummary {
    pub pending: usize,
    pub timeout_ms: u128,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        await_outcome: state.pipeline.await_outcome(),
    })
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheSummary> {
    Json(CacheSummary {
        entries: state.storage.cache().len(),
    })
}

pub async fn delete_cache_entry(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    tracing::info!(cache_key = %key, "Admin cache invalidation");
    state.storage.delete_cached(&key).await;
    StatusCode::NO_CONTENT
}

pub async fn get_dispatch(State(state): State<AppState>) -> Json<DispatchSummary> {
    Json(DispatchSummary {
        pending: state.pending.len(),
        timeout_ms: state.pipeline.dispatcher().timeout().as_millis(),
    })
}
