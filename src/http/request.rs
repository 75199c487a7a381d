//! Request extraction.
//!
//! # Responsibilities
//! - Give every request a fresh request id (the command correlation id)
//! - Capture the trace id, culture, principal and `Accept` header
//! - Collect raw body, query string and path parameters for binding
//! - Read `multipart/form-data`: text fields become a JSON body, the first
//!   file part is kept as an upload
//!
//! # Design Decisions
//! - Context extraction never fails; authorization decides what a missing
//!   principal means
//! - Binding happens in the pipeline, not here, so each handler chooses
//!   between command and query binding rules

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError},
        FromRequest, FromRequestParts, RawPathParams, Request,
    },
    http::{header, request::Parts, HeaderMap, Method},
};
use serde_json::{Map, Value};
use std::convert::Infallible;
use std::time::Instant;
use uuid::Uuid;

use crate::auth::Principal;
use crate::pipeline::PipelineError;

/// Header carrying the trace id set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Culture used when the client sends no `Accept-Language`.
pub const DEFAULT_CULTURE: &str = "en-gb";

/// Per-request facts handed to the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub trace_id: Option<String>,
    pub method: Method,
    pub path: String,
    pub culture: String,
    pub principal: Option<Principal>,
    pub accept: Option<String>,
    pub started_at: Instant,
}

impl RequestContext {
    /// Context for a request with no headers of interest.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            trace_id: None,
            method,
            path: path.into(),
            culture: DEFAULT_CULTURE.to_string(),
            principal: None,
            accept: None,
            started_at: Instant::now(),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let header_str = |name: header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            request_id: Uuid::new_v4(),
            trace_id: header_str(header::HeaderName::from_static(X_REQUEST_ID)),
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            culture: parse_culture(header_str(header::ACCEPT_LANGUAGE).as_deref()),
            principal: parts.extensions.get::<Principal>().cloned(),
            accept: header_str(header::ACCEPT),
            started_at: Instant::now(),
        }
    }

    /// Whether the client accepts a JSON response.
    pub fn accepts_json(&self) -> bool {
        accepts_json(self.accept.as_deref())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// A file part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file was sent under.
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Raw material for binding a command or query.
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    pub body: Bytes,
    pub query: Option<String>,
    pub path_params: Vec<(String, String)>,
    pub file: Option<UploadedFile>,
}

impl RequestInput {
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.file = Some(file);
        self
    }
}

impl<S: Send + Sync> FromRequest<S> for RequestInput {
    type Rejection = PipelineError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let path_params = match RawPathParams::from_request_parts(&mut parts, state).await {
            Ok(params) => params
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            Err(_) => Vec::new(),
        };
        let query = parts.uri.query().map(str::to_string);

        if is_multipart(&parts.headers) {
            let multipart = Multipart::from_request(Request::from_parts(parts, body), state)
                .await
                .map_err(|e| PipelineError::Binding(format!("malformed multipart body: {e}")))?;
            let (body, file) = read_multipart(multipart).await?;
            return Ok(Self {
                body,
                query,
                path_params,
                file,
            });
        }

        // Size limits are enforced by the body-limit layer.
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| PipelineError::Binding(format!("unreadable request body: {e}")))?;

        Ok(Self {
            body,
            query,
            path_params,
            file: None,
        })
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().to_lowercase().starts_with("multipart/form-data"))
}

fn malformed(e: MultipartError) -> PipelineError {
    PipelineError::Binding(format!("malformed multipart body: {e}"))
}

/// Text parts become string fields of a JSON object body. Only the first
/// file part is kept.
async fn read_multipart(mut multipart: Multipart) -> Result<(Bytes, Option<UploadedFile>), PipelineError> {
    let mut fields = Map::new();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match field.file_name().map(str::to_string) {
            Some(file_name) if file.is_none() => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(malformed)?;
                tracing::info!(file_name = %file_name, content_type = %content_type, size = data.len(), "Uploading file");
                file = Some(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    data,
                });
            }
            Some(file_name) => {
                tracing::debug!(field = %name, file_name = %file_name, "Ignoring additional file part");
            }
            None => {
                let text = field.text().await.map_err(malformed)?;
                fields.insert(name, Value::String(text));
            }
        }
    }

    let body = serde_json::to_vec(&Value::Object(fields))
        .map_err(|e| PipelineError::Binding(e.to_string()))?;
    Ok((Bytes::from(body), file))
}

/// First language tag of `Accept-Language`, lowercased.
pub fn parse_culture(accept_language: Option<&str>) -> String {
    accept_language
        .and_then(|value| value.split(',').next())
        .and_then(|tag| tag.split(';').next())
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty() && tag != "*")
        .unwrap_or_else(|| DEFAULT_CULTURE.to_string())
}

/// True when `accept` is absent or admits `application/json`.
pub fn accepts_json(accept: Option<&str>) -> bool {
    let Some(accept) = accept.map(str::trim).filter(|a| !a.is_empty()) else {
        return true;
    };
    accept
        .split(',')
        .filter_map(|range| range.split(';').next())
        .map(|media| media.trim().to_lowercase())
        .any(|media| matches!(media.as_str(), "application/json" | "application/*" | "*/*"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_culture_parsing() {
        assert_eq!(parse_culture(None), "en-gb");
        assert_eq!(parse_culture(Some("PL-pl, en;q=0.8")), "pl-pl");
        assert_eq!(parse_culture(Some("de;q=0.9")), "de");
        assert_eq!(parse_culture(Some("   ")), "en-gb");
    }

    #[test]
    fn test_content_negotiation() {
        assert!(accepts_json(None));
        assert!(accepts_json(Some("application/json")));
        assert!(accepts_json(Some("text/html, */*;q=0.1")));
        assert!(accepts_json(Some("application/*")));
        assert!(!accepts_json(Some("text/html")));
        assert!(!accepts_json(Some("application/xml")));
    }

    #[test]
    fn test_context_from_parts() {
        let request = axum::http::Request::builder()
            .uri("/remarks?page=2")
            .header(X_REQUEST_ID, "trace-1")
            .header(header::ACCEPT_LANGUAGE, "pl-PL")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        parts.extensions.insert(Principal::new("u1", "user", "active"));

        let ctx = RequestContext::from_parts(&parts);
        assert_eq!(ctx.path, "/remarks");
        assert_eq!(ctx.trace_id.as_deref(), Some("trace-1"));
        assert_eq!(ctx.culture, "pl-pl");
        assert_eq!(ctx.principal.unwrap().user_id, "u1");
    }
}
