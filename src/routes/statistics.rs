//! Statistics routes. Read-only and cached.

use axum::{extract::State, response::Response, routing::get, Router};
use serde::{Deserialize, Serialize};

use crate::http::request::{RequestContext, RequestInput};
use crate::http::server::AppState;
use crate::queries::{with_query, PagedQuery, Paging, Query};
use crate::routes::Document;
use crate::storage::{segment, StorageError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowseStatistics {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub order_by: Option<String>,
    pub page: u32,
    pub results: u32,
}

impl Query for BrowseStatistics {}

impl PagedQuery for BrowseStatistics {
    fn paging(&self) -> Paging {
        Paging::new(self.page, self.results)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetStatistics {
    pub id: String,
}

impl Query for GetStatistics {}

/// Remark counts, optionally bounded by date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetGeneralStatistics {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Query for GetGeneralStatistics {}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/statistics/remarks", get(remarks))
        .route("/statistics/remarks/general", get(general))
        .route("/statistics/remarks/{id}", get(remark))
        .route("/statistics/users", get(users))
        .route("/statistics/users/{id}", get(user))
        .route("/statistics/categories", get(categories))
        .route("/statistics/tags", get(tags))
}

async fn browse(state: AppState, ctx: RequestContext, input: RequestInput, endpoint: &'static str) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<BrowseStatistics>(ctx, input)
        .handle_collection(|query| async move {
            storage
                .get_filtered_using_cache::<Document, _>(&query, endpoint, None, None)
                .await
        })
        .await
}

async fn remarks(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    browse(state, ctx, input, "statistics/remarks").await
}

async fn users(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    browse(state, ctx, input, "statistics/users").await
}

async fn categories(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    browse(state, ctx, input, "statistics/categories").await
}

async fn tags(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    browse(state, ctx, input, "statistics/tags").await
}

async fn single(state: AppState, ctx: RequestContext, input: RequestInput, endpoint: &'static str) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<GetStatistics>(ctx, input)
        .handle(|query| async move {
            storage
                .get_using_cache::<Document>(&format!("{endpoint}/{}", segment(&query.id)), None, None)
                .await
        })
        .await
}

async fn remark(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    single(state, ctx, input, "statistics/remarks").await
}

async fn user(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    single(state, ctx, input, "statistics/users").await
}

async fn general(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<GetGeneralStatistics>(ctx, input)
        .handle(|query| async move {
            match with_query("statistics/remarks/general", &query) {
                Ok(endpoint) => storage.get_using_cache::<Document>(&endpoint, None, None).await,
                Err(e) => Err(StorageError::InvalidEndpoint {
                    endpoint: "statistics/remarks/general".to_string(),
                    message: e.to_string(),
                }),
            }
        })
        .await
}
