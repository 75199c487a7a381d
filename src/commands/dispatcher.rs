//! Command dispatcher: publish, then wait for the correlated outcome.
//!
//! # Data Flow
//! ```text
//! dispatch(request, command)
//!     → register request.id in PendingOperations
//!     → publish (retries on transport failures, same correlation id)
//!     → wait for OperationUpdate or the dispatch timeout
//!     → Outcome
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::commands::bus::{BusError, CommandBus};
use crate::commands::command::{BusMessage, Command, Request};
use crate::commands::outcome::Outcome;
use crate::commands::pending::PendingOperations;
use crate::observability::metrics;
use crate::resilience::backoff::backoff_for;
use crate::resilience::retries::RetryPolicy;

/// Publishes commands and correlates their outcomes.
#[derive(Clone)]
pub struct CommandDispatcher {
    bus: Arc<dyn CommandBus>,
    pending: PendingOperations,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(
        bus: Arc<dyn CommandBus>,
        pending: PendingOperations,
        retry_policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            bus,
            pending,
            retry_policy,
            timeout,
        }
    }

    pub fn pending(&self) -> &PendingOperations {
        &self.pending
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Publish `command` and wait for its outcome.
    ///
    /// Never waits longer than the dispatch timeout once published. A missing
    /// reply is [`Outcome::Timeout`]; the command itself is not retracted.
    pub async fn dispatch<C: Command>(&self, request: &Request, command: &C) -> Outcome {
        let outcome = self.dispatch_inner(request, command).await;
        self.record(request, &outcome);
        outcome
    }

    /// Publish `command` without waiting for an outcome.
    pub async fn publish<C: Command>(&self, request: &Request, command: &C) -> Outcome {
        let outcome = match BusMessage::new(request.clone(), command) {
            Ok(message) => match self.publish_with_retries(&message).await {
                Ok(()) => Outcome::Accepted,
                Err(e) => Outcome::DispatchFailed(e.to_string()),
            },
            Err(e) => Outcome::DispatchFailed(BusError::Serialization(e.to_string()).to_string()),
        };
        self.record(request, &outcome);
        outcome
    }

    async fn dispatch_inner<C: Command>(&self, request: &Request, command: &C) -> Outcome {
        let message = match BusMessage::new(request.clone(), command) {
            Ok(message) => message,
            Err(e) => return Outcome::DispatchFailed(BusError::Serialization(e.to_string()).to_string()),
        };

        let Some(mut guard) = self.pending.register(request.id, self.timeout) else {
            return Outcome::DispatchFailed(format!("request {} is already pending", request.id));
        };

        if let Err(e) = self.publish_with_retries(&message).await {
            return Outcome::DispatchFailed(e.to_string());
        }

        match tokio::time::timeout(self.timeout, guard.wait()).await {
            Ok(Some(update)) => Outcome::from(update),
            Ok(None) | Err(_) => Outcome::Timeout,
        }
    }

    async fn publish_with_retries(&self, message: &BusMessage) -> Result<(), BusError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.bus.publish(message).await {
                Ok(()) => return Ok(()),
                Err(e) if self.retry_policy.should_retry(&e, attempts) => {
                    let delay = backoff_for(self.retry_policy.config(), attempts);
                    tracing::warn!(
                        request_id = %message.correlation_id(),
                        attempt = attempts,
                        delay = ?delay,
                        error = %e,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record(&self, request: &Request, outcome: &Outcome) {
        metrics::record_dispatch_outcome(outcome.label());
        match outcome {
            Outcome::Completed { .. } | Outcome::Accepted => {
                tracing::info!(request_id = %request.id, command = %request.name, outcome = outcome.label(), "Command dispatched");
            }
            Outcome::Rejected { code, .. } => {
                tracing::info!(request_id = %request.id, command = %request.name, code = %code, "Command rejected");
            }
            Outcome::Timeout => {
                tracing::warn!(request_id = %request.id, command = %request.name, "No outcome within dispatch window");
            }
            Outcome::DispatchFailed(reason) => {
                tracing::error!(request_id = %request.id, command = %request.name, reason = %reason, "Command dispatch failed");
            }
        }
    }
}
