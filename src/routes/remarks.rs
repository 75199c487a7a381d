//! Remark routes.

use axum::{
    extract::State,
    response::Response,
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::commands::{Command, FilePayload};
use crate::http::request::{RequestContext, RequestInput};
use crate::http::server::AppState;
use crate::queries::{PagedQuery, Paging, Query};
use crate::routes::Document;
use crate::storage::segment;
use crate::validation::{ValidatorRegistry, Violation};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowseRemarks {
    pub author_id: Option<String>,
    /// Comma-separated category names.
    pub categories: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
    pub latest: Option<bool>,
    pub page: u32,
    pub results: u32,
}

impl Query for BrowseRemarks {}

impl PagedQuery for BrowseRemarks {
    fn paging(&self) -> Paging {
        Paging::new(self.page, self.results)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseCategories {}

impl Query for BrowseCategories {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetRemark {
    pub remark_id: String,
}

impl Query for GetRemark {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRemark {
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub user_id: String,
}

impl Command for CreateRemark {
    const NAME: &'static str = "create_remark";
    const REQUIRES_AUTH: bool = true;

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRemark {
    pub remark_id: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub user_id: String,
}

impl Command for ResolveRemark {
    const NAME: &'static str = "resolve_remark";
    const REQUIRES_AUTH: bool = true;

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRemark {
    pub remark_id: String,
    #[serde(default)]
    pub user_id: String,
}

impl Command for DeleteRemark {
    const NAME: &'static str = "delete_remark";
    const REQUIRES_AUTH: bool = true;

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteComment {
    pub remark_id: String,
    pub comment_id: String,
    #[serde(default)]
    pub user_id: String,
}

impl Command for DeleteComment {
    const NAME: &'static str = "delete_comment";

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

/// Multipart upload: the image arrives as the `photo` file part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPhotoToRemark {
    pub remark_id: String,
    pub photo: FilePayload,
    #[serde(default)]
    pub user_id: String,
}

impl Command for AddPhotoToRemark {
    const NAME: &'static str = "add_photo_to_remark";
    const REQUIRES_AUTH: bool = true;

    fn set_user_id(&mut self, user_id: String) {
        self.user_id = user_id;
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/remarks", get(browse_remarks).post(create_remark))
        .route("/remarks/categories", get(browse_categories))
        .route("/remarks/{remarkId}", get(get_remark).delete(delete_remark))
        .route("/remarks/{remarkId}/photo", get(get_remark_photo).post(add_photo))
        .route("/remarks/{remarkId}/resolve", put(resolve_remark))
        .route("/remarks/{remarkId}/comments/{commentId}", delete(delete_comment))
}

/// Structural checks on new remarks.
pub fn register_validators(registry: &mut ValidatorRegistry) {
    registry
        .register::<CreateRemark, _>(|c: &CreateRemark| {
            let mut violations = Vec::new();
            if !(-90.0..=90.0).contains(&c.latitude) {
                violations.push(Violation::field("latitude", "must be between -90 and 90"));
            }
            if !(-180.0..=180.0).contains(&c.longitude) {
                violations.push(Violation::field("longitude", "must be between -180 and 180"));
            }
            violations
        })
        .register::<CreateRemark, _>(|c: &CreateRemark| {
            if c.category.trim().is_empty() {
                vec![Violation::field("category", "must not be empty")]
            } else {
                Vec::new()
            }
        })
        .register::<AddPhotoToRemark, _>(|c: &AddPhotoToRemark| {
            let mut violations = Vec::new();
            if !c.photo.content_type.starts_with("image/") {
                violations.push(Violation::field("photo", "must be an image"));
            }
            if c.photo.base64.is_empty() {
                violations.push(Violation::field("photo", "must not be empty"));
            }
            violations
        });
}

async fn browse_remarks(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<BrowseRemarks>(ctx, input)
        .handle_collection(|query| async move {
            storage
                .get_filtered_using_cache::<Document, _>(&query, "remarks", None, None)
                .await
        })
        .await
}

async fn browse_categories(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<BrowseCategories>(ctx, input)
        .handle_collection(|_| async move {
            storage
                .get_collection_using_cache::<Document>("remarks/categories", None, None)
                .await
        })
        .await
}

async fn get_remark(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    state
        .pipeline
        .fetch::<GetRemark>(ctx, input)
        .handle(|query| async move { storage.get::<Document>(&format!("remarks/{}", segment(&query.remark_id))).await })
        .await
}

async fn get_remark_photo(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    let storage = state.storage.clone();
    let file_name = input
        .path_params
        .iter()
        .find(|(name, _)| name == "remarkId")
        .map(|(_, id)| format!("{id}.jpg"))
        .unwrap_or_else(|| "photo.jpg".to_string());
    state
        .pipeline
        .fetch::<GetRemark>(ctx, input)
        .handle_stream(
            |query| async move { storage.get_stream(&format!("remarks/{}/photo", segment(&query.remark_id))).await },
            &file_name,
            None,
        )
        .await
}

async fn create_remark(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.command::<CreateRemark>(ctx, input).dispatch().await
}

async fn add_photo(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.command::<AddPhotoToRemark>(ctx, input).dispatch().await
}

async fn resolve_remark(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.command::<ResolveRemark>(ctx, input).dispatch().await
}

async fn delete_remark(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.command::<DeleteRemark>(ctx, input).dispatch().await
}

async fn delete_comment(State(state): State<AppState>, ctx: RequestContext, input: RequestInput) -> Response {
    state.pipeline.for_moderator::<DeleteComment>(ctx, input).dispatch().await
}
