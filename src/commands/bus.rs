//! Command bus seam and its adapters.
//!
//! # Responsibilities
//! - Publish command messages to the command-processing side
//! - Report transport failures distinctly from downstream rejections
//!
//! # Design Decisions
//! - `publish` only acknowledges receipt; outcomes arrive separately and are
//!   matched through [`PendingOperations`]
//! - The HTTP adapter sends the correlation id as a header so the receiver can
//!   drop duplicates produced by publish retries

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use url::Url;

use crate::commands::command::BusMessage;
use crate::commands::outcome::OperationUpdate;
use crate::commands::pending::PendingOperations;

/// Header carrying the correlation id on published commands.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Failures publishing to the bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("command bus unreachable: {0}")]
    Unreachable(String),

    #[error("command bus publish timed out")]
    Timeout,

    #[error("command bus answered with status {0}")]
    Status(u16),

    #[error("command bus is closed")]
    Closed,

    #[error("command could not be serialized: {0}")]
    Serialization(String),
}

/// Publishes commands.
#[async_trait]
pub trait CommandBus: Send + Sync {
    async fn publish(&self, message: &BusMessage) -> Result<(), BusError>;
}

/// In-process bus backed by a bounded channel.
#[derive(Clone)]
pub struct ChannelBus {
    tx: mpsc::Sender<BusMessage>,
}

impl ChannelBus {
    /// Create the bus and the receiving end consumers read from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BusMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl CommandBus for ChannelBus {
    async fn publish(&self, message: &BusMessage) -> Result<(), BusError> {
        self.tx.send(message.clone()).await.map_err(|_| BusError::Closed)
    }
}

/// Bus adapter that POSTs commands to `{endpoint}/commands/{name}`.
#[derive(Clone)]
pub struct HttpCommandBus {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpCommandBus {
    pub fn new(endpoint: &str, publish_timeout: Duration) -> Result<Self, BusError> {
        let mut normalized = endpoint.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let endpoint = Url::parse(&normalized)
            .map_err(|e| BusError::Unreachable(format!("invalid bus endpoint '{endpoint}': {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(publish_timeout)
            .build()
            .map_err(|e| BusError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, endpoint })
    }

    fn command_url(&self, name: &str) -> Result<Url, BusError> {
        self.endpoint
            .join(&format!("commands/{name}"))
            .map_err(|e| BusError::Serialization(format!("invalid command name '{name}': {e}")))
    }
}

#[async_trait]
impl CommandBus for HttpCommandBus {
    async fn publish(&self, message: &BusMessage) -> Result<(), BusError> {
        let url = self.command_url(message.command_name())?;
        let response = self
            .http
            .post(url)
            .header(CORRELATION_HEADER, message.correlation_id().to_string())
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BusError::Timeout
                } else {
                    BusError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BusError::Status(status.as_u16()))
        }
    }
}

/// Acknowledge every command read from an in-process bus.
///
/// Used when no command service is configured, so local setups still see
/// commands resolve.
pub async fn run_loopback(
    mut rx: mpsc::Receiver<BusMessage>,
    pending: PendingOperations,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!("Loopback command consumer starting");
    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else { break };
                tracing::debug!(
                    request_id = %message.correlation_id(),
                    command = message.command_name(),
                    "Loopback acknowledging command"
                );
                pending.complete(OperationUpdate {
                    request_id: message.correlation_id(),
                    success: true,
                    code: None,
                    message: None,
                });
            }
            _ = shutdown.recv() => {
                tracing::info!("Loopback consumer received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
