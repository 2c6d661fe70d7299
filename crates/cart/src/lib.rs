//! `gomarket-cart` — the cart domain.
//!
//! **Responsibility:** the canonical in-memory cart collection and its
//! mutation rules. This crate is pure: no I/O, no clocks, no channels.
//! Persistence and change notification live in `gomarket-client`.

pub mod cart;
pub mod item;

pub use cart::{Cart, CartEvent};
pub use item::{CatalogItem, LineItem};
