//! The stateful cart store: read-through load, write-behind persistence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gomarket_cart::{Cart, CartEvent, CatalogItem, LineItem};
use gomarket_core::ProductId;
use thiserror::Error;
use tokio::sync::{watch, Mutex, MutexGuard, Notify};

use crate::storage::{BackingStore, PRODUCTS_KEY};
use crate::worker::{PendingSnapshot, PersistAck, PersistWorker};

/// Error surface of the cart store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store was used after `close()`. Consumers must hold a handle to a
    /// live store; this fails loudly instead of dropping the operation.
    #[error("cart store is closed")]
    Closed,

    /// A persist attempt failed. Only `flush()` and `close()` report this;
    /// mutations never block on, or fail because of, the backing store.
    #[error("cart persistence failed: {0}")]
    Persist(String),
}

/// How the initial read-through load went.
///
/// The store always comes up (degrading to an empty cart), but the embedder
/// can inspect this to surface a warning when stored state was unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The persisted blob was present and decoded; the cart starts from it.
    Loaded { items: usize },
    /// Nothing was ever persisted; the cart starts empty.
    Fresh,
    /// The read or decode failed; the cart starts empty.
    Failed { reason: String },
}

struct State {
    cart: Cart,
    /// Bumped on every effective mutation; pairs mutations with persist
    /// acknowledgements.
    version: u64,
}

struct Inner {
    state: Mutex<State>,
    closed: AtomicBool,
    load_outcome: LoadOutcome,
    /// Latest published snapshot; consumers re-render when the reference
    /// changes.
    snapshot_tx: watch::Sender<Arc<[LineItem]>>,
    /// Coalescing queue feeding the persist worker.
    pending_tx: watch::Sender<PendingSnapshot>,
    /// Persist acknowledgements from the worker.
    status_rx: watch::Receiver<PersistAck>,
    shutdown: Arc<Notify>,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// Cheaply cloneable handle to the cart state.
///
/// One instance per process backs all UI consumers; pass clones of the
/// handle to whoever needs to read or mutate the cart. Mutations serialize
/// behind a single lock, so overlapping calls can never act on a stale base
/// sequence.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<Inner>,
}

impl CartStore {
    /// Open the store over a backing store, loading persisted state once.
    ///
    /// Never fails: an unreadable or absent blob degrades to an empty cart,
    /// with the distinction captured in [`CartStore::load_outcome`].
    pub async fn open(backing: Arc<dyn BackingStore>) -> Self {
        let (items, outcome) = match backing.read(PRODUCTS_KEY).await {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<LineItem>>(&blob) {
                Ok(items) => {
                    let outcome = LoadOutcome::Loaded { items: items.len() };
                    (items, outcome)
                }
                Err(err) => {
                    let reason = format!("stored cart blob is not valid JSON: {err}");
                    tracing::warn!(%reason, "cart load degraded to empty");
                    (Vec::new(), LoadOutcome::Failed { reason })
                }
            },
            Ok(None) => (Vec::new(), LoadOutcome::Fresh),
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::warn!(%reason, "cart load degraded to empty");
                (Vec::new(), LoadOutcome::Failed { reason })
            }
        };

        let cart = Cart::hydrate(items);
        let snapshot: Arc<[LineItem]> = Arc::from(cart.items());

        let (snapshot_tx, _) = watch::channel(Arc::clone(&snapshot));
        let (pending_tx, pending_rx) = watch::channel(PendingSnapshot {
            version: 0,
            items: snapshot,
        });
        let (status_tx, status_rx) = watch::channel(PersistAck {
            version: 0,
            error: None,
        });
        let shutdown = Arc::new(Notify::new());

        let worker =
            PersistWorker::new(backing, pending_rx, status_tx, Arc::clone(&shutdown)).spawn();

        tracing::info!(outcome = ?outcome, items = cart.len(), "cart store opened");

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State { cart, version: 0 }),
                closed: AtomicBool::new(false),
                load_outcome: outcome,
                snapshot_tx,
                pending_tx,
                status_rx,
                shutdown,
                worker: Mutex::new(Some(worker)),
            }),
        }
    }

    /// Add a catalog item: first add appends with quantity 1, further adds
    /// of the same id bump the existing entry.
    pub async fn add_to_cart(&self, item: CatalogItem) -> Result<CartEvent, StoreError> {
        let mut state = self.lock_open().await?;
        let event = state.cart.add(item);
        self.publish(&mut state, &event);
        Ok(event)
    }

    /// Raise an entry's quantity by one. Absent ids are a silent no-op
    /// (`Ok(None)`); nothing changes and nothing is persisted.
    pub async fn increment(&self, id: &ProductId) -> Result<Option<CartEvent>, StoreError> {
        let mut state = self.lock_open().await?;
        let Some(event) = state.cart.increment(id) else {
            tracing::debug!(product = %id, "increment of absent product ignored");
            return Ok(None);
        };
        self.publish(&mut state, &event);
        Ok(Some(event))
    }

    /// Lower an entry's quantity by one, removing the entry when it would
    /// drop below 1. Absent ids are a silent no-op (`Ok(None)`).
    pub async fn decrement(&self, id: &ProductId) -> Result<Option<CartEvent>, StoreError> {
        let mut state = self.lock_open().await?;
        let Some(event) = state.cart.decrement(id) else {
            tracing::debug!(product = %id, "decrement of absent product ignored");
            return Ok(None);
        };
        self.publish(&mut state, &event);
        Ok(Some(event))
    }

    /// Remove every entry at once. `Ok(None)` when already empty.
    pub async fn clear(&self) -> Result<Option<CartEvent>, StoreError> {
        let mut state = self.lock_open().await?;
        let Some(event) = state.cart.clear() else {
            return Ok(None);
        };
        self.publish(&mut state, &event);
        Ok(Some(event))
    }

    /// The current ordered line-item sequence. A new reference is published
    /// on every change, so consumers can compare by pointer to skip
    /// re-renders.
    pub fn products(&self) -> Arc<[LineItem]> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Change notification: the receiver yields the latest snapshot whenever
    /// a mutation publishes a new one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<[LineItem]>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// How the initial read-through load went.
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.inner.load_outcome
    }

    /// Version of the latest mutation (0 before any mutation).
    pub fn version(&self) -> u64 {
        self.inner.pending_tx.borrow().version
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Wait until a persist attempt covering the current version completes.
    ///
    /// Returns [`StoreError::Persist`] if that attempt failed; the in-memory
    /// state is unaffected either way.
    pub async fn flush(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let target = self.version();
        let mut status_rx = self.inner.status_rx.clone();

        loop {
            let ack = status_rx.borrow_and_update().clone();
            if ack.version >= target {
                return match ack.error {
                    Some(reason) => Err(StoreError::Persist(reason)),
                    None => Ok(()),
                };
            }
            status_rx
                .changed()
                .await
                .map_err(|_| StoreError::Closed)?;
        }
    }

    /// Stop the store after a final persist of the latest state.
    ///
    /// Reports the outcome of that final persist. Idempotent: further calls
    /// return `Ok(())`, while mutations and `flush` fail with
    /// [`StoreError::Closed`].
    pub async fn close(&self) -> Result<(), StoreError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Let any mutation that passed the closed check finish publishing
        // before the worker takes its final pass.
        drop(self.inner.state.lock().await);
        self.inner.shutdown.notify_one();

        if let Some(handle) = self.inner.worker.lock().await.take() {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "persist worker did not shut down cleanly");
            }
        }

        let ack = self.inner.status_rx.borrow().clone();
        let target = self.version();
        tracing::info!(version = target, "cart store closed");

        if ack.version < target {
            return Err(StoreError::Persist(format!(
                "store shut down before version {target} was persisted"
            )));
        }
        match ack.error {
            Some(reason) => Err(StoreError::Persist(reason)),
            None => Ok(()),
        }
    }

    async fn lock_open(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        let state = self.inner.state.lock().await;
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(state)
    }

    /// Bump the version, hand consumers a fresh snapshot reference, and
    /// queue the snapshot for the persist worker.
    fn publish(&self, state: &mut State, event: &CartEvent) {
        state.version += 1;
        let snapshot: Arc<[LineItem]> = Arc::from(state.cart.items());

        self.inner.snapshot_tx.send_replace(Arc::clone(&snapshot));
        self.inner.pending_tx.send_replace(PendingSnapshot {
            version: state.version,
            items: snapshot,
        });

        tracing::debug!(version = state.version, event = ?event, "cart mutated");
    }
}
