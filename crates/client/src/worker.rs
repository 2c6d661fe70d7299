//! Background worker that writes cart snapshots behind mutations.

use std::sync::Arc;

use anyhow::Context;
use gomarket_cart::LineItem;
use tokio::sync::{watch, Notify};

use crate::storage::{BackingStore, PRODUCTS_KEY};

/// A versioned snapshot queued for persistence.
///
/// Version 0 is the initial (never-mutated) state and is never written: the
/// worker only persists what a mutation produced.
#[derive(Debug, Clone)]
pub(crate) struct PendingSnapshot {
    pub version: u64,
    pub items: Arc<[LineItem]>,
}

/// Acknowledgement of a persist attempt, consumed by `flush`/`close`.
#[derive(Debug, Clone)]
pub(crate) struct PersistAck {
    /// Highest snapshot version a persist attempt has covered.
    pub version: u64,
    /// Failure description of that attempt, `None` on success.
    pub error: Option<String>,
}

/// Write-behind persister: the only writer to the backing store.
///
/// Snapshots arrive through a latest-value channel, so bursts of mutations
/// coalesce naturally: while one write is in flight, intermediate snapshots
/// are replaced by newer ones and only the latest is written next.
pub(crate) struct PersistWorker {
    backing: Arc<dyn BackingStore>,
    pending_rx: watch::Receiver<PendingSnapshot>,
    status_tx: watch::Sender<PersistAck>,
    shutdown: Arc<Notify>,
}

impl PersistWorker {
    pub(crate) fn new(
        backing: Arc<dyn BackingStore>,
        pending_rx: watch::Receiver<PendingSnapshot>,
        status_tx: watch::Sender<PersistAck>,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            backing,
            pending_rx,
            status_tx,
            shutdown,
        }
    }

    pub(crate) fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        tracing::debug!("persist worker started");

        // Highest version a persist attempt has covered so far.
        let mut attempted = 0u64;

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    self.final_pass(attempted).await;
                    break;
                }
                changed = self.pending_rx.changed() => {
                    if changed.is_err() {
                        // Store handle dropped without close(); persist what
                        // is left and stop.
                        self.final_pass(attempted).await;
                        break;
                    }
                    let pending = self.pending_rx.borrow_and_update().clone();
                    if pending.version <= attempted {
                        continue;
                    }
                    attempted = pending.version;
                    self.persist(&pending).await;
                }
            }
        }

        tracing::debug!("persist worker stopped");
    }

    /// Write any snapshot that arrived after the last attempt, then
    /// acknowledge it so waiting `flush`/`close` callers resolve.
    async fn final_pass(&self, attempted: u64) {
        let pending = self.pending_rx.borrow().clone();
        if pending.version > attempted {
            self.persist(&pending).await;
        }
    }

    async fn persist(&self, pending: &PendingSnapshot) {
        let error = match self.write(pending).await {
            Ok(()) => {
                tracing::debug!(
                    version = pending.version,
                    items = pending.items.len(),
                    "persisted cart snapshot"
                );
                None
            }
            Err(err) => {
                tracing::error!(
                    version = pending.version,
                    error = %format!("{err:#}"),
                    "failed to persist cart snapshot"
                );
                Some(format!("{err:#}"))
            }
        };

        self.status_tx.send_replace(PersistAck {
            version: pending.version,
            error,
        });
    }

    async fn write(&self, pending: &PendingSnapshot) -> anyhow::Result<()> {
        let payload = serde_json::to_string(pending.items.as_ref())
            .context("failed to serialize cart snapshot")?;
        self.backing.write(PRODUCTS_KEY, &payload).await
    }
}
