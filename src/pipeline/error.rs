//! Pipeline failures and their protocol mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;
use crate::validation::Violation;

/// Every way a command or fetch request can end without success.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request could not be bound: {0}")]
    Binding(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("caller lacks the required role")]
    Forbidden,

    #[error("command failed validation")]
    ValidationFailed(Vec<Violation>),

    #[error("command rejected: {code}")]
    Rejected { code: String, message: Option<String> },

    #[error("no outcome within the dispatch window")]
    Timeout,

    #[error("command could not be dispatched: {0}")]
    Dispatch(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("resource not found")]
    NotFound,

    #[error("requested media type is not supported")]
    NotAcceptable,
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Binding(_) | Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Rejected { .. } => StatusCode::CONFLICT,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Dispatch(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(e) => match e {
                StorageError::Timeout(_) | StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                StorageError::Status { .. } | StorageError::Decode { .. } => StatusCode::BAD_GATEWAY,
                StorageError::InvalidEndpoint { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
        }
    }

    /// Machine-readable code sent to clients.
    pub fn code(&self) -> &str {
        match self {
            Self::Binding(_) => "binding_error",
            Self::Unauthenticated => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Rejected { code, .. } => code,
            Self::Timeout => "timeout",
            Self::Dispatch(_) => "dispatch_error",
            Self::Storage(e) if e.is_unavailable() => "storage_unavailable",
            Self::Storage(_) => "storage_error",
            Self::NotFound => "not_found",
            Self::NotAcceptable => "not_acceptable",
        }
    }

    /// Build the error response, tagged with the request id when known.
    pub fn into_response_with_id(self, request_id: Option<Uuid>) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        };
        let code = self.code().to_string();
        let violations = match self {
            Self::ValidationFailed(violations) => Some(violations),
            _ => None,
        };

        let body = ErrorBody {
            code,
            message,
            request_id,
            violations,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        self.into_response_with_id(None)
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}
