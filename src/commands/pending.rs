//! Table of dispatches waiting for their correlated outcome.
//!
//! # Responsibilities
//! - Map correlation id → single-use reply channel
//! - Deliver replies to the waiting request
//! - Drop entries whose request went away or whose deadline passed
//!
//! # Design Decisions
//! - Registration returns a guard; dropping it (cancelled request, timeout)
//!   removes the entry, so the table never outgrows in-flight requests
//! - The reaper only catches entries whose guard is somehow still alive past
//!   the deadline; it closes the channel, which the waiter sees as a timeout
//! - Replies for unknown ids are logged and ignored

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;
use uuid::Uuid;

use crate::commands::outcome::OperationUpdate;
use crate::observability::metrics;

struct PendingEntry {
    tx: oneshot::Sender<OperationUpdate>,
    deadline: Instant,
}

/// Shared table of pending dispatches.
#[derive(Clone, Default)]
pub struct PendingOperations {
    inner: Arc<DashMap<Uuid, PendingEntry>>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for `id`. Returns `None` if `id` is already pending.
    pub fn register(&self, id: Uuid, ttl: Duration) -> Option<PendingGuard> {
        let (tx, rx) = oneshot::channel();
        match self.inner.entry(id) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    tx,
                    deadline: Instant::now() + ttl,
                });
            }
        }
        metrics::record_pending_dispatches(self.inner.len());

        Some(PendingGuard {
            id,
            rx,
            table: self.clone(),
        })
    }

    /// Deliver an outcome. Returns false when nobody is waiting for it.
    pub fn complete(&self, update: OperationUpdate) -> bool {
        let request_id = update.request_id;
        let Some((_, entry)) = self.inner.remove(&request_id) else {
            tracing::warn!(request_id = %request_id, "Outcome for unknown or resolved request ignored");
            return false;
        };
        metrics::record_pending_dispatches(self.inner.len());

        if entry.tx.send(update).is_err() {
            tracing::debug!(request_id = %request_id, "Waiter gone before outcome arrived");
            return false;
        }
        true
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove entries past their deadline. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.deadline > now);
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Reaped expired dispatches");
            metrics::record_pending_dispatches(self.inner.len());
        }
        removed
    }

    /// Periodically reap expired entries until shutdown is signalled.
    pub async fn run_reaper(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?interval, "Dispatch reaper starting");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.purge_expired();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Dispatch reaper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn forget(&self, id: &Uuid) {
        if self.inner.remove(id).is_some() {
            metrics::record_pending_dispatches(self.inner.len());
        }
    }
}

/// A registered wait. Dropping it unregisters the id.
pub struct PendingGuard {
    id: Uuid,
    rx: oneshot::Receiver<OperationUpdate>,
    table: PendingOperations,
}

impl PendingGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the outcome. `None` when the entry was reaped.
    pub async fn wait(&mut self) -> Option<OperationUpdate> {
        (&mut self.rx).await.ok()
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.table.forget(&self.id);
    }
}
