//! Success responses.
//!
//! # Responsibilities
//! - JSON bodies for fetched items and pages
//! - `X-Total-Count` on paged responses
//! - Operation acknowledgements with a `Location` to poll
//! - Streamed attachments without buffering
//!
//! Error responses are built by [`PipelineError`](crate::pipeline::PipelineError).

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::queries::PagedResult;
use crate::storage::StorageStream;

/// Header carrying the collection size on paged responses.
pub const X_TOTAL_COUNT: &str = "x-total-count";

/// Body of a command acknowledgement.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationAccepted {
    pub request_id: Uuid,
}

pub fn json<T: Serialize>(value: &T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

/// A page as JSON plus `X-Total-Count`.
pub fn paged<T: Serialize>(page: &PagedResult<T>) -> Response {
    let mut response = json(page);
    response
        .headers_mut()
        .insert(X_TOTAL_COUNT, HeaderValue::from(page.total_count));
    response
}

/// Acknowledge a command and point at the operation to poll.
pub fn operation(status: StatusCode, request_id: Uuid) -> Response {
    let mut response = (status, Json(OperationAccepted { request_id })).into_response();
    if let Ok(location) = HeaderValue::from_str(&format!("operations/{request_id}")) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    response
}

/// Stream a storage payload to the client as a file download.
pub fn attachment(stream: StorageStream, file_name: &str, content_type: Option<&str>) -> Response {
    let content_type = content_type
        .map(str::to_string)
        .or(stream.content_type)
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));

    let mut response = Response::new(Body::from_stream(stream.body));
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(length) = stream.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    response
}
