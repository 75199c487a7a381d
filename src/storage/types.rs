//! Storage client types and error definitions.

use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Transport-level failures reaching a storage service.
///
/// A remote 404 is not an error; it is reported as an empty `Maybe`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No response within the configured timeout.
    #[error("storage request to '{0}' timed out")]
    Timeout(String),

    /// Connection could not be established.
    #[error("storage service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a status other than 2xx or 404.
    #[error("storage service returned {status} for '{endpoint}'")]
    Status { status: u16, endpoint: String },

    /// The response body did not match the expected shape.
    #[error("invalid storage payload from '{endpoint}': {message}")]
    Decode { endpoint: String, message: String },

    /// The endpoint or query could not be turned into a URL.
    #[error("invalid storage endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

impl StorageError {
    /// True for failures where the service was not reached or did not answer in time.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// A binary payload streamed from a storage service.
pub struct StorageStream {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, StorageResult<Bytes>>,
}

impl std::fmt::Debug for StorageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageStream")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish()
    }
}
