//! `gomarket-client` — the stateful cart store.
//!
//! **Responsibility:** a local durable cache for the cart collection:
//! read-through load from a [`storage::BackingStore`] at open, single-writer
//! mutations over the pure [`gomarket_cart::Cart`], watch-published
//! snapshots for UI consumers, and coalescing write-behind persistence.

pub mod storage;
pub mod store;
mod worker;

pub use storage::{BackingStore, MemoryBackingStore, SqliteBackingStore, PRODUCTS_KEY};
pub use store::{CartStore, LoadOutcome, StoreError};
