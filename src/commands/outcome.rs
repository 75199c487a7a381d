//! Correlated results of dispatched commands.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reply from the command-processing side, matched to a request by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationUpdate {
    pub request_id: Uuid,
    pub success: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reason code used when a rejection carries none.
pub const DEFAULT_REJECTION_CODE: &str = "rejected";

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Downstream processed the command.
    Completed {
        code: Option<String>,
        message: Option<String>,
    },
    /// Published without waiting for a reply.
    Accepted,
    /// Downstream refused the command.
    Rejected { code: String, message: Option<String> },
    /// No reply within the dispatch window.
    Timeout,
    /// The command never reached the bus.
    DispatchFailed(String),
}

impl Outcome {
    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Accepted => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Timeout => "timeout",
            Self::DispatchFailed(_) => "dispatch_failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Accepted)
    }
}

impl From<OperationUpdate> for Outcome {
    fn from(update: OperationUpdate) -> Self {
        if update.success {
            Self::Completed {
                code: update.code,
                message: update.message,
            }
        } else {
            Self::Rejected {
                code: update
                    .code
                    .unwrap_or_else(|| DEFAULT_REJECTION_CODE.to_string()),
                message: update.message,
            }
        }
    }
}
