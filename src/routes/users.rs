//! User and account routes.

use axum::{
    extract::State,
    response::Response,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::http::request::{RequestContext, RequestInput};
use crate::http::server::AppState;
use crate::queries::{PagedQuery, Paging, Query};
use crate::routes::Document;
use crate::storage::segment;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowseUsers {
    pub name: Option<String>,
    pub page: u32,
    pub results: u32,
}

impl Query for BrowseUsers {}

impl PagedQuery for BrowseUsers {
    fn paging(&self) -> Paging {
        Paging::new(self.page, self.results)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetUserByName {
    pub name: String,
}

impl Query for GetUserByName {}

/// The caller's own account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetAccount {
    pub user_id: String,
}

impl Query for GetAccount {
    const REQUIRES_AUTH: bool = true;

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockUser {
    pub name: String,
    #[serde(default)]
    pub user_id: String,
}

impl Command for LockUser {
    const NAME: &'static str = "lock_user";

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockUser {
    pub name: String,
    #[serde(default)]
    pub user_id: String,
}

impl Command for UnlockUser {
    const NAME: &'static str = "unlock_user";

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUserRole {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub user_id: String,
}

impl Command for ChangeUserRole {
    const NAME: &'static str = "change_user_role";

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(get_account))
        .route("/users", get(browse_users))
        .route("/users/{name}", get(get_user))
        .route("/users/{name}/lock", put(lock_user))
        .route("/users/{name}/unlock", put(unlock_user))
        .route("/users/{name}/role", put(change_user_role))
}

async fn get_account(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<GetAccount>(ctx, input)
        .handle(|query| async move { storage.get::<Document>(&format!("users/{}/account", segment(&query.user_id))).await })
        .await
}

async fn browse_users(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<BrowseUsers>(ctx, input)
        .handle_collection(|query| async move { storage.get_filtered::<Document, _>(&query, "users").await })
        .await
}

async fn get_user(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<GetUserByName>(ctx, input)
        .handle(|query| async move {
            storage
                .get_using_cache::<Document>(&format!("users/{}", segment(&query.name)), None, None)
                .await
        })
        .await
}

async fn lock_user(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.for_administrator::<LockUser>(ctx, input).dispatch().await
}

async fn unlock_user(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.for_administrator::<UnlockUser>(ctx, input).dispatch().await
}

async fn change_user_role(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.for_owner::<ChangeUserRole>(ctx, input).dispatch().await
}
