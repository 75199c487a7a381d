//! Fetch-request handler.
//!
//! # Data Flow
//! ```text
//! Bound → Authorized (authenticated queries only) → Fetched → Filtered → Responded
//!   400        401                               404/502/503   404 when emptied
//! ```

use axum::response::Response;
use serde::Serialize;
use std::future::Future;

use crate::http::request::{RequestContext, RequestInput};
use crate::http::response;
use crate::observability::metrics;
use crate::pipeline::{authorize, binding, Pipeline, PipelineError};
use crate::queries::{Maybe, PagedResult, Query};
use crate::storage::{StorageResult, StorageStream};

/// Drives one read request through the pipeline.
pub struct FetchRequestHandler<Q> {
    pipeline: Pipeline,
    ctx: RequestContext,
    query: Result<Q, PipelineError>,
}

impl<Q: Query> FetchRequestHandler<Q> {
    pub(crate) fn new(pipeline: Pipeline, ctx: RequestContext, input: RequestInput) -> Self {
        let query = binding::bind_query::<Q>(&input).and_then(|mut query| {
            if Q::REQUIRES_AUTH {
                let principal = authorize(ctx.principal.as_ref(), None)?;
                query.set_user_id(principal.user_id.clone());
            }
            Ok(query)
        });
        Self { pipeline, ctx, query }
    }

    /// Fetch a single item; empty → 404.
    pub async fn handle<T, F, Fut>(self, fetch: F) -> Response
    where
        T: Serialize + 'static,
        F: FnOnce(Q) -> Fut,
        Fut: Future<Output = StorageResult<Maybe<T>>>,
    {
        let pipeline = self.pipeline.clone();
        self.respond(|query| async move {
            let item = fetch(query.clone())
                .await?
                .into_option()
                .ok_or(PipelineError::NotFound)?;
            let filter = pipeline.filters().resolve::<T, Q>();
            let item = filter
                .apply(vec![item], &query)
                .into_iter()
                .next()
                .ok_or(PipelineError::NotFound)?;
            Ok(response::json(&item))
        }, true)
        .await
    }

    /// Fetch a page; empty `Maybe` → 404. Filters apply to the page's items.
    pub async fn handle_collection<T, F, Fut>(self, fetch: F) -> Response
    where
        T: Serialize + 'static,
        F: FnOnce(Q) -> Fut,
        Fut: Future<Output = StorageResult<Maybe<PagedResult<T>>>>,
    {
        let pipeline = self.pipeline.clone();
        self.respond(|query| async move {
            let mut page = fetch(query.clone())
                .await?
                .into_option()
                .ok_or(PipelineError::NotFound)?;
            if !page.items.is_empty() {
                let filter = pipeline.filters().resolve::<T, Q>();
                page.items = filter.apply(std::mem::take(&mut page.items), &query);
            }
            Ok(response::paged(&page))
        }, true)
        .await
    }

    /// Fetch a binary payload and send it as a download; empty → 404.
    pub async fn handle_stream<F, Fut>(self, fetch: F, file_name: &str, content_type: Option<&str>) -> Response
    where
        F: FnOnce(Q) -> Fut,
        Fut: Future<Output = StorageResult<Maybe<StorageStream>>>,
    {
        self.respond(|query| async move {
            let stream = fetch(query).await?.into_option().ok_or(PipelineError::NotFound)?;
            Ok(response::attachment(stream, file_name, content_type))
        }, false)
        .await
    }

    async fn respond<F, Fut>(self, run: F, json: bool) -> Response
    where
        F: FnOnce(Q) -> Fut,
        Fut: Future<Output = Result<Response, PipelineError>>,
    {
        let ctx = self.ctx;
        let result = match self.query {
            Ok(_) if json && !ctx.accepts_json() => Err(PipelineError::NotAcceptable),
            Ok(query) => run(query).await,
            Err(e) => Err(e),
        };

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                if matches!(error, PipelineError::NotFound) {
                    tracing::debug!(request_id = %ctx.request_id, path = %ctx.path, "Resource not found");
                } else {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        trace_id = ?ctx.trace_id,
                        path = %ctx.path,
                        status = error.status().as_u16(),
                        error = %error,
                        "Fetch request failed"
                    );
                }
                error.into_response_with_id(Some(ctx.request_id))
            }
        };

        metrics::record_request(ctx.method.as_str(), response.status().as_u16(), "query", ctx.started_at);
        response
    }
}
