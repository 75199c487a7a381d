//! Operation status and the outcome callback.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::commands::OperationUpdate;
use crate::http::middleware::bearer_token;
use crate::http::request::{RequestContext, RequestInput};
use crate::http::server::AppState;
use crate::queries::Query;
use crate::routes::Document;
use crate::storage::segment;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetOperation {
    pub request_id: String,
}

impl Query for GetOperation {}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/operations", post(operation_update))
        .route("/operations/{requestId}", get(get_operation))
}

async fn get_operation(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<GetOperation>(ctx, input)
        .handle(|query| async move { storage.get::<Document>(&format!("operations/{}", segment(&query.request_id))).await })
        .await
}

/// Outcome delivery from the command service.
///
/// 200 when a waiting request was resolved, 202 when nobody was waiting.
async fn operation_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<OperationUpdate>,
) -> StatusCode {
    if bearer_token(&headers) != Some(state.config.bus.callback_key.as_str()) {
        tracing::warn!(request_id = %update.request_id, "Rejected outcome callback with invalid key");
        return StatusCode::UNAUTHORIZED;
    }

    if state.pending.complete(update) {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    }
}
