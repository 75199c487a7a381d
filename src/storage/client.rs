//! HTTP client for the query-serving storage services.
//!
//! # Responsibilities
//! - Fetch single items, collections and filtered collections as JSON
//! - Stream binary payloads without buffering them
//! - Cache-aside reads through a [`CacheStore`]
//! - Fail over across base URLs on transport errors
//!
//! # Design Decisions
//! - A remote 404 is absence (`Maybe::none`), never an error
//! - Only transport failures move on to the next base URL; an HTTP status is
//!   the service's answer and is reported as-is
//! - Cache failures are logged and fall through to the backend
//! - Empty results are never cached

use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::cache::CacheStore;
use crate::config::StorageConfig;
use crate::observability::metrics;
use crate::queries::{with_query, Maybe, PagedQuery, PagedResult};
use crate::storage::types::{StorageError, StorageResult, StorageStream};

/// Storage client with failover base URLs and a shared cache.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    /// Primary base URL followed by failovers, each ending in '/'.
    base_urls: Vec<Url>,
    cache: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl StorageClient {
    /// Create a client from configuration.
    ///
    /// An invalid primary URL is an error; invalid failover URLs are skipped.
    pub fn new(
        config: &StorageConfig,
        cache: Arc<dyn CacheStore>,
        default_ttl: Duration,
    ) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StorageError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        let mut base_urls = vec![parse_base_url(&config.base_url)?];
        for url_str in &config.failover_urls {
            match parse_base_url(url_str) {
                Ok(url) => base_urls.push(url),
                Err(e) => tracing::warn!(url = %url_str, error = %e, "Ignoring invalid failover storage URL"),
            }
        }

        tracing::info!(
            base_url = %config.base_url,
            failovers = base_urls.len() - 1,
            "Storage client initialized"
        );

        Ok(Self {
            http,
            base_urls,
            cache,
            default_ttl,
        })
    }

    /// The cache used by the `*_using_cache` variants.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Fetch a single item.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> StorageResult<Maybe<T>> {
        let value = self.fetch_value(endpoint).await?;
        decode(endpoint, value)
    }

    /// Fetch a collection as `{items, totalCount}`.
    pub async fn get_collection<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> StorageResult<Maybe<PagedResult<T>>> {
        let value = self.fetch_value(endpoint).await?;
        decode(endpoint, value)
    }

    /// Fetch a collection filtered by the query's fields, paging included.
    pub async fn get_filtered<T, Q>(&self, query: &Q, endpoint: &str) -> StorageResult<Maybe<PagedResult<T>>>
    where
        T: DeserializeOwned,
        Q: PagedQuery,
    {
        let target = filtered_endpoint(endpoint, query)?;
        let value = self.fetch_value(&target).await?;
        let page: Maybe<PagedResult<T>> = decode(&target, value)?;
        Ok(page.map(|p| p.with_paging_defaults(query.paging())))
    }

    /// Cache-aside [`get`](Self::get). The key defaults to the endpoint.
    pub async fn get_using_cache<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        cache_key: Option<&str>,
        expiry: Option<Duration>,
    ) -> StorageResult<Maybe<T>> {
        let key = cache_key.unwrap_or(endpoint);
        self.cache_aside(endpoint, key, expiry, is_empty_item).await
    }

    /// Cache-aside [`get_collection`](Self::get_collection).
    pub async fn get_collection_using_cache<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        cache_key: Option<&str>,
        expiry: Option<Duration>,
    ) -> StorageResult<Maybe<PagedResult<T>>> {
        let key = cache_key.unwrap_or(endpoint);
        self.cache_aside(endpoint, key, expiry, is_empty_page).await
    }

    /// Cache-aside [`get_filtered`](Self::get_filtered). The default key is the
    /// endpoint plus the serialized query, so equal queries share an entry.
    pub async fn get_filtered_using_cache<T, Q>(
        &self,
        query: &Q,
        endpoint: &str,
        cache_key: Option<&str>,
        expiry: Option<Duration>,
    ) -> StorageResult<Maybe<PagedResult<T>>>
    where
        T: DeserializeOwned,
        Q: PagedQuery,
    {
        let target = filtered_endpoint(endpoint, query)?;
        let key = cache_key.unwrap_or(&target);
        let page: Maybe<PagedResult<T>> = self.cache_aside(&target, key, expiry, is_empty_page).await?;
        Ok(page.map(|p| p.with_paging_defaults(query.paging())))
    }

    /// Open a binary stream. Never cached.
    pub async fn get_stream(&self, endpoint: &str) -> StorageResult<Maybe<StorageStream>> {
        let start = Instant::now();
        let Some(response) = self.send(endpoint).await? else {
            metrics::record_storage_fetch("absent", start);
            return Ok(Maybe::none());
        };
        metrics::record_storage_fetch("found", start);

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        let owned_endpoint = endpoint.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify(&owned_endpoint, &e)))
            .boxed();

        Ok(Maybe::some(StorageStream {
            content_type,
            content_length,
            body,
        }))
    }

    /// Invalidate a cache entry.
    pub async fn delete_cached(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            tracing::warn!(cache_key = key, error = %e, "Cache delete failed");
        }
    }

    async fn cache_aside<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        key: &str,
        expiry: Option<Duration>,
        is_empty: fn(&Value) -> bool,
    ) -> StorageResult<Maybe<T>> {
        match self.cache.get(key).await {
            Ok(cached) => {
                if let Some(value) = cached.into_option() {
                    match serde_json::from_value::<T>(value) {
                        Ok(item) => {
                            metrics::record_cache_lookup(true);
                            tracing::debug!(cache_key = key, "Cache hit");
                            return Ok(Maybe::some(item));
                        }
                        Err(e) => {
                            tracing::warn!(cache_key = key, error = %e, "Discarding undecodable cache entry");
                            self.delete_cached(key).await;
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(cache_key = key, error = %e, "Cache read failed, fetching from storage"),
        }
        metrics::record_cache_lookup(false);

        let fetched = self.fetch_value(endpoint).await?;
        let Some(value) = fetched.into_option() else {
            return Ok(Maybe::none());
        };
        if is_empty(&value) {
            return decode(endpoint, Maybe::some(value));
        }

        let item = decode_one(endpoint, value.clone())?;
        let ttl = expiry.unwrap_or(self.default_ttl);
        if let Err(e) = self.cache.add(key, value, Some(ttl)).await {
            tracing::warn!(cache_key = key, error = %e, "Cache write failed");
        }
        Ok(Maybe::some(item))
    }

    async fn fetch_value(&self, endpoint: &str) -> StorageResult<Maybe<Value>> {
        let start = Instant::now();
        let result = self.fetch_value_inner(endpoint).await;
        let label = match &result {
            Ok(v) if v.has_value() => "found",
            Ok(_) => "absent",
            Err(_) => "error",
        };
        metrics::record_storage_fetch(label, start);
        result
    }

    async fn fetch_value_inner(&self, endpoint: &str) -> StorageResult<Maybe<Value>> {
        let Some(response) = self.send(endpoint).await? else {
            return Ok(Maybe::none());
        };
        let body = response.bytes().await.map_err(|e| classify(endpoint, &e))?;
        if body.is_empty() {
            return Ok(Maybe::none());
        }
        let value: Value = serde_json::from_slice(&body).map_err(|e| StorageError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        if value.is_null() {
            return Ok(Maybe::none());
        }
        Ok(Maybe::some(value))
    }

    /// Issue a GET, trying each base URL until one answers.
    ///
    /// Returns `None` for 404.
    async fn send(&self, endpoint: &str) -> StorageResult<Option<reqwest::Response>> {
        let relative = endpoint.trim_start_matches('/');
        let mut last_error = None;

        for (i, base) in self.base_urls.iter().enumerate() {
            let url = base.join(relative).map_err(|e| StorageError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;
            if !url.as_str().starts_with(base.as_str()) {
                return Err(StorageError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    message: "endpoint resolves outside the storage base URL".into(),
                });
            }

            match self.http.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status.is_success() {
                        return Ok(Some(response));
                    }
                    tracing::warn!(base_idx = i, endpoint, status = status.as_u16(), "Storage returned error status");
                    return Err(StorageError::Status {
                        status: status.as_u16(),
                        endpoint: endpoint.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(base_idx = i, endpoint, error = %e, "Storage request failed, trying next base URL");
                    last_error = Some(classify(endpoint, &e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| StorageError::Unavailable(format!("no storage URL for '{endpoint}'"))))
    }
}

/// Percent-encode one path segment so it cannot add segments or a query to
/// an endpoint. Dot segments are rejected at binding time.
pub fn segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn parse_base_url(raw: &str) -> StorageResult<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| StorageError::InvalidEndpoint {
        endpoint: raw.to_string(),
        message: e.to_string(),
    })
}

fn filtered_endpoint<Q: PagedQuery>(endpoint: &str, query: &Q) -> StorageResult<String> {
    with_query(endpoint, query).map_err(|e| StorageError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn classify(endpoint: &str, error: &reqwest::Error) -> StorageError {
    if error.is_timeout() {
        StorageError::Timeout(endpoint.to_string())
    } else {
        StorageError::Unavailable(format!("{endpoint}: {error}"))
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Maybe<Value>) -> StorageResult<Maybe<T>> {
    match value.into_option() {
        Some(v) => decode_one(endpoint, v).map(Maybe::some),
        None => Ok(Maybe::none()),
    }
}

fn decode_one<T: DeserializeOwned>(endpoint: &str, value: Value) -> StorageResult<T> {
    serde_json::from_value(value).map_err(|e| StorageError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn is_empty_item(value: &Value) -> bool {
    value.is_null()
}

fn is_empty_page(value: &Value) -> bool {
    value
        .get("items")
        .and_then(Value::as_array)
        .map_or(true, |items| items.is_empty())
}
