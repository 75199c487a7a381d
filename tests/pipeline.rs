//! End-to-end pipeline behaviour through the router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use command_gateway::commands::{CommandBus, PendingOperations};
use command_gateway::config::GatewayConfig;
use command_gateway::queries::FilterRegistry;
use command_gateway::routes::remarks::{BrowseRemarks, GetRemark};
use command_gateway::GatewayServer;

mod common;
use common::{Reply, TestBus};

struct Harness {
    app: Router,
    bus: Arc<TestBus>,
    config: GatewayConfig,
    pending: PendingOperations,
}

async fn harness(reply: Reply) -> Harness {
    let (storage, _) = common::start_programmable_backend(|target| async move {
        if target.starts_with("/remarks/missing") {
            (404, String::new())
        } else if target.starts_with("/remarks?") || target == "/remarks" {
            (200, json!({"items": [{"id": "1"}, {"id": "2"}], "totalCount": 25}).to_string())
        } else {
            (200, json!({"id": "1"}).to_string())
        }
    })
    .await;
    harness_with(common::test_config(storage), reply)
}

fn harness_with(config: GatewayConfig, reply: Reply) -> Harness {
    harness_with_filters(config, reply, FilterRegistry::new())
}

fn harness_with_filters(config: GatewayConfig, reply: Reply, filters: FilterRegistry) -> Harness {
    let pending = PendingOperations::new();
    let bus = TestBus::new(reply, pending.clone());
    let dyn_bus: Arc<dyn CommandBus> = bus.clone();
    let state = common::test_state_with_filters(config.clone(), dyn_bus, pending.clone(), filters);
    Harness {
        app: GatewayServer::build_router(state),
        bus,
        config,
        pending,
    }
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn put(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_remark() -> Value {
    json!({"category": "litter", "latitude": 52.2, "longitude": 21.0, "description": "bottles"})
}

#[tokio::test]
async fn test_unauthenticated_command_is_never_dispatched() {
    let h = harness(Reply::Succeed).await;

    let response = h.app.clone().oneshot(post("/remarks", None, valid_remark())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "unauthorized");
    assert!(body["requestId"].is_string());

    let response = h
        .app
        .clone()
        .oneshot(post("/remarks", Some("garbage-token"), valid_remark()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.bus.calls(), 0);
}

#[tokio::test]
async fn test_violations_are_aggregated_and_block_dispatch() {
    let h = harness(Reply::Succeed).await;
    let token = common::token_for(&h.config, "user-1", "user");

    let invalid = json!({"category": "", "latitude": 95.0, "longitude": 200.0});
    let response = h.app.clone().oneshot(post("/remarks", Some(&token), invalid)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "validation_failed");
    assert_eq!(body["violations"].as_array().unwrap().len(), 3);
    assert_eq!(h.bus.calls(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_a_binding_error() {
    let h = harness(Reply::Succeed).await;
    let token = common::token_for(&h.config, "user-1", "user");

    let request = Request::builder()
        .method("POST")
        .uri("/remarks")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("{not json"))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "binding_error");
    assert_eq!(h.bus.calls(), 0);
}

#[tokio::test]
async fn test_successful_command_echoes_request_id() {
    let h = harness(Reply::Succeed).await;
    let token = common::token_for(&h.config, "user-1", "user");

    let response = h.app.clone().oneshot(post("/remarks", Some(&token), valid_remark())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let body = json_body(response).await;
    let request_id = body["requestId"].as_str().unwrap();
    assert_eq!(location, format!("operations/{request_id}"));
    assert_eq!(h.bus.calls(), 1);
    assert!(h.pending.is_empty());
}

#[tokio::test]
async fn test_rejection_maps_to_conflict() {
    let h = harness(Reply::Reject).await;
    let token = common::token_for(&h.config, "user-1", "user");

    let response = h.app.clone().oneshot(put("/remarks/7/resolve", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "remark_not_found");
}

#[tokio::test]
async fn test_silent_bus_times_out() {
    let h = harness(Reply::Silent).await;
    let token = common::token_for(&h.config, "user-1", "user");

    let response = h.app.clone().oneshot(post("/remarks", Some(&token), valid_remark())).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["code"], "timeout");
    assert_eq!(h.bus.calls(), 1);
    assert!(h.pending.is_empty());
}

#[tokio::test]
async fn test_fire_and_forget_answers_accepted() {
    let (storage, _) = common::start_programmable_backend(|_| async { (404, String::new()) }).await;
    let mut config = common::test_config(storage);
    config.dispatch.await_outcome = false;
    let h = harness_with(config, Reply::Silent);
    let token = common::token_for(&h.config, "user-1", "user");

    let response = h.app.clone().oneshot(post("/remarks", Some(&token), valid_remark())).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.headers().contains_key(header::LOCATION));
    assert_eq!(h.bus.calls(), 1);
}

#[tokio::test]
async fn test_role_tiers_use_exact_membership() {
    let h = harness(Reply::Succeed).await;
    let moderator = common::token_for(&h.config, "mod-1", "moderator");
    let administrator = common::token_for(&h.config, "admin-1", "administrator");

    let response = h.app.clone().oneshot(put("/users/alice/lock", &moderator)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.bus.calls(), 0);

    let response = h.app.clone().oneshot(put("/users/alice/lock", &administrator)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.bus.calls(), 1);

    let change_role = |token: &str| {
        Request::builder()
            .method("PUT")
            .uri("/users/alice/role")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(json!({"role": "moderator"}).to_string()))
            .unwrap()
    };
    let response = h.app.clone().oneshot(change_role(&administrator)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let owner = common::token_for(&h.config, "owner-1", "owner");
    let response = h.app.clone().oneshot(change_role(&owner)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.bus.calls(), 2);
}

#[tokio::test]
async fn test_absent_resource_is_not_found() {
    let h = harness(Reply::Succeed).await;

    let response = h.app.clone().oneshot(get("/remarks/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "not_found");

    let response = h.app.clone().oneshot(get("/remarks/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["id"], "1");
}

#[tokio::test]
async fn test_paged_fetch_reports_total_count() {
    let h = harness(Reply::Succeed).await;

    let response = h.app.clone().oneshot(get("/remarks?page=2&results=10")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "25");
    let body = json_body(response).await;
    assert_eq!(body["totalCount"], 25);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let response = h.app.clone().oneshot(get("/remarks?page=two")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_media_type_is_not_acceptable() {
    let h = harness(Reply::Succeed).await;
    let request = Request::builder()
        .uri("/remarks/1")
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn test_authenticated_query_requires_principal() {
    let h = harness(Reply::Succeed).await;

    let response = h.app.clone().oneshot(get("/account")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = common::token_for(&h.config, "user-1", "user");
    let request = Request::builder()
        .uri("/account")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_outcome_callback_requires_bus_key() {
    let h = harness(Reply::Silent).await;
    let update = json!({"requestId": uuid::Uuid::new_v4(), "success": true});

    let response = h.app.clone().oneshot(post("/operations", Some("wrong"), update.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nobody is waiting for this id.
    let response = h.app.clone().oneshot(post("/operations", Some("bus-key"), update)).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_admin_endpoints_require_key() {
    let h = harness(Reply::Succeed).await;

    let response = h.app.clone().oneshot(get("/admin/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/admin/dispatch")
        .header(header::AUTHORIZATION, "Bearer admin-key")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["pending"], 0);

    let request = Request::builder()
        .uri("/admin/cache")
        .header(header::AUTHORIZATION, "Bearer admin-key")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["entries"], 0);
}

fn visible(values: Vec<Value>) -> Vec<Value> {
    values.into_iter().filter(|value| value["hidden"] != true).collect()
}

#[tokio::test]
async fn test_path_parameters_stay_inside_their_endpoint() {
    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let log = seen.clone();
    let (storage, _) = common::start_programmable_backend(move |target| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(target.clone());
            if target == "/users/bob/account" {
                (200, json!({"secret": "bob-private-account"}).to_string())
            } else {
                (404, String::new())
            }
        }
    })
    .await;
    let h = harness_with(common::test_config(storage), Reply::Succeed);

    let response = h.app.clone().oneshot(get("/remarks/..%2Fusers%2Fbob%2Faccount")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = h.app.clone().oneshot(get("/users/..%2Fusers%2Fbob%2Faccount")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = h.app.clone().oneshot(get("/remarks/%2E%2E")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "binding_error");

    let seen = seen.lock().unwrap().clone();
    assert!(seen.contains(&"/remarks/..%2Fusers%2Fbob%2Faccount".to_string()));
    assert!(!seen.contains(&"/users/bob/account".to_string()));
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn test_filters_apply_to_pages_and_single_items() {
    let (storage, _) = common::start_programmable_backend(|target| async move {
        if target.starts_with("/remarks?") || target == "/remarks" {
            let items = json!([{"id": "1"}, {"id": "2", "hidden": true}, {"id": "3"}]);
            (200, json!({"items": items, "totalCount": 25}).to_string())
        } else if target == "/remarks/hidden" {
            (200, json!({"id": "hidden", "hidden": true}).to_string())
        } else {
            (200, json!({"id": "1"}).to_string())
        }
    })
    .await;
    let mut filters = FilterRegistry::new();
    filters
        .register::<Value, BrowseRemarks, _>(|values: Vec<Value>, _query: &BrowseRemarks| visible(values))
        .register::<Value, GetRemark, _>(|values: Vec<Value>, _query: &GetRemark| visible(values));
    let h = harness_with_filters(common::test_config(storage), Reply::Succeed, filters);

    let response = h.app.clone().oneshot(get("/remarks?page=1&results=3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "25");
    let body = json_body(response).await;
    assert_eq!(body["totalCount"], 25);
    assert_eq!(body["items"], json!([{"id": "1"}, {"id": "3"}]));

    let response = h.app.clone().oneshot(get("/remarks/hidden")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "not_found");

    let response = h.app.clone().oneshot(get("/remarks/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_storage_failures_map_to_gateway_statuses() {
    let (storage, _) = common::start_programmable_backend(|_| async { (500, String::new()) }).await;
    let h = harness_with(common::test_config(storage), Reply::Succeed);

    let response = h.app.clone().oneshot(get("/remarks/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["code"], "storage_error");
    assert!(body["requestId"].is_string());

    let h = harness_with(common::test_config(common::closed_addr().await), Reply::Succeed);
    let response = h.app.clone().oneshot(get("/remarks/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["code"], "storage_unavailable");

    let response = h.app.clone().oneshot(get("/remarks?page=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

fn photo_upload(token: &str, content_type: &str) -> Request<Body> {
    let body = format!(
        "--X\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"pothole.jpg\"\r\nContent-Type: {content_type}\r\n\r\njpeg-bytes\r\n--X--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/remarks/7/photo")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_uploaded_file_binds_into_command() {
    let h = harness(Reply::Succeed).await;
    let token = common::token_for(&h.config, "user-1", "user");

    let response = h.app.clone().oneshot(photo_upload(&token, "image/jpeg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let published = h.bus.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].command_name(), "add_photo_to_remark");
    let payload = &published[0].payload;
    assert_eq!(payload["remarkId"], "7");
    assert_eq!(payload["userId"], "user-1");
    assert_eq!(payload["photo"]["name"], "pothole.jpg");
    assert_eq!(payload["photo"]["contentType"], "image/jpeg");
    assert_eq!(payload["photo"]["base64"], "anBlZy1ieXRlcw==");

    let response = h.app.clone().oneshot(photo_upload(&token, "text/plain")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "validation_failed");
    assert_eq!(h.bus.calls(), 1);
}

#[tokio::test]
async fn test_statistics_items_and_general_counts() {
    let (storage, _) = common::start_programmable_backend(|target| async move {
        match target.as_str() {
            "/statistics/remarks/general?endDate=2024-02-01&startDate=2024-01-01" => {
                (200, json!({"reported": 10, "resolved": 4}).to_string())
            }
            "/statistics/users/u1" => (200, json!({"id": "u1", "reportedCount": 3}).to_string()),
            _ => (404, String::new()),
        }
    })
    .await;
    let h = harness_with(common::test_config(storage), Reply::Succeed);

    let response = h
        .app
        .clone()
        .oneshot(get("/statistics/remarks/general?startDate=2024-01-01&endDate=2024-02-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["reported"], 10);

    let response = h.app.clone().oneshot(get("/statistics/users/u1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["reportedCount"], 3);

    let response = h.app.clone().oneshot(get("/statistics/remarks/r9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_the_handler() {
    let (storage, _) = common::start_programmable_backend(|_| async { (404, String::new()) }).await;
    let mut config = common::test_config(storage);
    config.security.max_body_size = 64;
    let h = harness_with(config, Reply::Succeed);
    let token = common::token_for(&h.config, "user-1", "user");

    let body = json!({"category": "litter", "latitude": 52.2, "longitude": 21.0, "description": "x".repeat(200)})
        .to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/remarks")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(h.bus.calls(), 0);
}
