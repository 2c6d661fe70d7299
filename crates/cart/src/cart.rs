//! The cart collection and its mutation rules.

use gomarket_core::ProductId;

use crate::item::{CatalogItem, LineItem};

/// Change produced by a cart mutation.
///
/// Consumers can use these to tell a fresh add from a quantity bump without
/// diffing snapshots; the store also logs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A product entered the cart with quantity 1.
    ItemAdded { id: ProductId },
    /// An existing entry's quantity went up by one.
    QuantityIncremented { id: ProductId, quantity: u32 },
    /// An existing entry's quantity went down by one.
    QuantityDecremented { id: ProductId, quantity: u32 },
    /// A decrement took the quantity below 1 and the entry left the cart.
    ItemRemoved { id: ProductId },
    /// Every entry left the cart at once.
    Cleared { removed: usize },
}

/// Insertion-ordered collection of line items, at most one entry per
/// product id.
///
/// A linear scan keys the collection: carts are small (tens of entries),
/// and the `Vec` keeps insertion order without a side index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from a persisted sequence.
    ///
    /// Blobs written by earlier sessions (or by hand) are normalized so the
    /// collection invariants hold: duplicate ids merge into the first
    /// occurrence with quantities summed, zero-quantity and empty-id entries
    /// are dropped. Order of first occurrences is preserved.
    pub fn hydrate(items: Vec<LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            if item.quantity == 0 || item.id.as_str().is_empty() {
                continue;
            }
            match cart.position(&item.id) {
                Some(index) => {
                    let existing = &mut cart.items[index];
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// Add a catalog item: the first add appends an entry with quantity 1,
    /// any further add of the same id bumps the existing entry instead.
    pub fn add(&mut self, item: CatalogItem) -> CartEvent {
        match self.position(&item.id) {
            Some(index) => {
                let line = &mut self.items[index];
                line.quantity = line.quantity.saturating_add(1);
                CartEvent::QuantityIncremented {
                    id: line.id.clone(),
                    quantity: line.quantity,
                }
            }
            None => {
                let line = LineItem::from_catalog(item);
                let id = line.id.clone();
                self.items.push(line);
                CartEvent::ItemAdded { id }
            }
        }
    }

    /// Raise the quantity of an existing entry by one.
    ///
    /// Absent ids are a silent no-op (`None`); the collection is unchanged.
    pub fn increment(&mut self, id: &ProductId) -> Option<CartEvent> {
        let index = self.position(id)?;
        let line = &mut self.items[index];
        line.quantity = line.quantity.saturating_add(1);
        Some(CartEvent::QuantityIncremented {
            id: line.id.clone(),
            quantity: line.quantity,
        })
    }

    /// Lower the quantity of an existing entry by one, removing the entry
    /// when the quantity would drop below 1.
    ///
    /// Absent ids are a silent no-op (`None`); the collection is unchanged.
    pub fn decrement(&mut self, id: &ProductId) -> Option<CartEvent> {
        let index = self.position(id)?;
        if self.items[index].quantity <= 1 {
            let removed = self.items.remove(index);
            return Some(CartEvent::ItemRemoved { id: removed.id });
        }
        let line = &mut self.items[index];
        line.quantity -= 1;
        Some(CartEvent::QuantityDecremented {
            id: line.id.clone(),
            quantity: line.quantity,
        })
    }

    /// Remove every entry. `None` when the cart was already empty.
    pub fn clear(&mut self) -> Option<CartEvent> {
        if self.items.is_empty() {
            return None;
        }
        let removed = self.items.len();
        self.items.clear();
        Some(CartEvent::Cleared { removed })
    }

    /// Current line items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of distinct products in the cart.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity currently held for a product, if present.
    pub fn quantity_of(&self, id: &ProductId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| item.quantity)
    }

    /// Total units across all entries (display value, saturating).
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(u64::from(item.quantity)))
    }

    /// Total price across all entries (display value, saturating).
    pub fn total_price(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.line_total()))
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_item(id: &str) -> CatalogItem {
        CatalogItem::new(id, format!("Product {id}"), format!("https://img.example/{id}.png"), 1500)
            .unwrap()
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id).unwrap()
    }

    #[test]
    fn first_add_appends_entry_with_quantity_one() {
        let mut cart = Cart::new();

        let event = cart.add(catalog_item("shirt"));

        assert_eq!(event, CartEvent::ItemAdded { id: pid("shirt") });
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&pid("shirt")), Some(1));
    }

    #[test]
    fn repeated_add_bumps_quantity_instead_of_duplicating() {
        let mut cart = Cart::new();
        cart.add(catalog_item("shirt"));

        let event = cart.add(catalog_item("shirt"));

        assert_eq!(
            event,
            CartEvent::QuantityIncremented {
                id: pid("shirt"),
                quantity: 2
            }
        );
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&pid("shirt")), Some(2));
    }

    #[test]
    fn increment_bumps_existing_entry() {
        let mut cart = Cart::new();
        cart.add(catalog_item("mug"));

        let event = cart.increment(&pid("mug"));

        assert_eq!(
            event,
            Some(CartEvent::QuantityIncremented {
                id: pid("mug"),
                quantity: 2
            })
        );
    }

    #[test]
    fn increment_of_absent_id_is_a_noop() {
        let mut cart = Cart::new();
        cart.add(catalog_item("shirt"));
        let before = cart.clone();

        let event = cart.increment(&pid("mug"));

        assert_eq!(event, None);
        assert_eq!(cart, before);
    }

    #[test]
    fn decrement_at_quantity_two_leaves_one() {
        let mut cart = Cart::new();
        cart.add(catalog_item("shirt"));
        cart.add(catalog_item("shirt"));

        let event = cart.decrement(&pid("shirt"));

        assert_eq!(
            event,
            Some(CartEvent::QuantityDecremented {
                id: pid("shirt"),
                quantity: 1
            })
        );
        assert_eq!(cart.quantity_of(&pid("shirt")), Some(1));
    }

    #[test]
    fn decrement_at_quantity_one_removes_entry() {
        let mut cart = Cart::new();
        cart.add(catalog_item("shirt"));

        let event = cart.decrement(&pid("shirt"));

        assert_eq!(event, Some(CartEvent::ItemRemoved { id: pid("shirt") }));
        assert!(cart.is_empty());
        assert_eq!(cart.quantity_of(&pid("shirt")), None);
    }

    #[test]
    fn decrement_of_absent_id_is_a_noop() {
        let mut cart = Cart::new();
        cart.add(catalog_item("shirt"));
        let before = cart.clone();

        let event = cart.decrement(&pid("mug"));

        assert_eq!(event, None);
        assert_eq!(cart, before);
    }

    #[test]
    fn insertion_order_survives_quantity_changes() {
        let mut cart = Cart::new();
        cart.add(catalog_item("a"));
        cart.add(catalog_item("b"));
        cart.add(catalog_item("c"));

        let _ = cart.increment(&pid("a"));
        let _ = cart.decrement(&pid("c"));
        cart.add(catalog_item("b"));

        let order: Vec<&str> = cart.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_empties_cart_and_reports_count() {
        let mut cart = Cart::new();
        cart.add(catalog_item("a"));
        cart.add(catalog_item("b"));

        let event = cart.clear();

        assert_eq!(event, Some(CartEvent::Cleared { removed: 2 }));
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_on_empty_cart_is_a_noop() {
        let mut cart = Cart::new();
        assert_eq!(cart.clear(), None);
    }

    #[test]
    fn hydrate_merges_duplicates_into_first_occurrence() {
        let items = vec![
            LineItem::with_quantity(catalog_item("b"), 2).unwrap(),
            LineItem::with_quantity(catalog_item("a"), 1).unwrap(),
            LineItem::with_quantity(catalog_item("b"), 3).unwrap(),
        ];

        let cart = Cart::hydrate(items);

        let order: Vec<&str> = cart.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(cart.quantity_of(&pid("b")), Some(5));
        assert_eq!(cart.quantity_of(&pid("a")), Some(1));
    }

    #[test]
    fn hydrate_drops_zero_quantity_entries() {
        let mut zero = LineItem::from_catalog(catalog_item("ghost"));
        zero.quantity = 0;
        let items = vec![zero, LineItem::from_catalog(catalog_item("real"))];

        let cart = Cart::hydrate(items);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&pid("real")), Some(1));
    }

    #[test]
    fn totals_sum_quantities_and_line_totals() {
        let mut cart = Cart::new();
        cart.add(CatalogItem::new("shirt", "Shirt", "https://img.example/shirt.png", 1500).unwrap());
        cart.add(CatalogItem::new("shirt", "Shirt", "https://img.example/shirt.png", 1500).unwrap());
        cart.add(CatalogItem::new("mug", "Mug", "https://img.example/mug.png", 700).unwrap());

        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.total_price(), 2 * 1500 + 700);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(usize),
            Increment(usize),
            Decrement(usize),
        }

        const ID_POOL: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..ID_POOL.len()).prop_map(Op::Add),
                (0..ID_POOL.len()).prop_map(Op::Increment),
                (0..ID_POOL.len()).prop_map(Op::Decrement),
            ]
        }

        fn arb_line_item() -> impl Strategy<Value = LineItem> {
            ("[a-f]{1,3}", 0u64..10_000u64, 0u32..50u32).prop_map(|(id, price, quantity)| {
                LineItem {
                    title: format!("Product {id}"),
                    image_url: format!("https://img.example/{id}.png"),
                    id: ProductId::new(id).unwrap(),
                    price,
                    quantity,
                }
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: no operation sequence can produce a duplicate id or
            /// a quantity below 1.
            #[test]
            fn quantities_stay_positive_and_ids_stay_unique(
                ops in prop::collection::vec(arb_op(), 0..200)
            ) {
                let mut cart = Cart::new();
                for op in ops {
                    match op {
                        Op::Add(i) => {
                            let _ = cart.add(catalog_item(ID_POOL[i]));
                        }
                        Op::Increment(i) => {
                            let _ = cart.increment(&pid(ID_POOL[i]));
                        }
                        Op::Decrement(i) => {
                            let _ = cart.decrement(&pid(ID_POOL[i]));
                        }
                    }

                    let mut seen = std::collections::HashSet::new();
                    for item in cart.items() {
                        prop_assert!(item.quantity >= 1);
                        prop_assert!(seen.insert(item.id.clone()));
                    }
                }
            }

            /// Property: adding the same item n times yields one entry with
            /// quantity exactly n.
            #[test]
            fn repeated_adds_accumulate_exactly(n in 1u32..100) {
                let mut cart = Cart::new();
                for _ in 0..n {
                    let _ = cart.add(catalog_item("shirt"));
                }

                prop_assert_eq!(cart.len(), 1);
                prop_assert_eq!(cart.quantity_of(&pid("shirt")), Some(n));
            }

            /// Property: hydration of an arbitrary persisted sequence never
            /// loses units and always restores the collection invariants.
            #[test]
            fn hydrate_normalizes_arbitrary_blobs(
                items in prop::collection::vec(arb_line_item(), 0..40)
            ) {
                let cart = Cart::hydrate(items.clone());

                let mut seen = std::collections::HashSet::new();
                for item in cart.items() {
                    prop_assert!(item.quantity >= 1);
                    prop_assert!(seen.insert(item.id.clone()));
                }

                for item in &items {
                    let expected: u32 = items
                        .iter()
                        .filter(|other| other.id == item.id)
                        .map(|other| other.quantity)
                        .sum();
                    if expected == 0 {
                        prop_assert_eq!(cart.quantity_of(&item.id), None);
                    } else {
                        prop_assert_eq!(cart.quantity_of(&item.id), Some(expected));
                    }
                }
            }

            /// Property: the wire format round-trips: serializing the items
            /// and hydrating them back reproduces the cart.
            #[test]
            fn wire_format_round_trips(
                ops in prop::collection::vec(arb_op(), 0..60)
            ) {
                let mut cart = Cart::new();
                for op in ops {
                    match op {
                        Op::Add(i) => {
                            let _ = cart.add(catalog_item(ID_POOL[i]));
                        }
                        Op::Increment(i) => {
                            let _ = cart.increment(&pid(ID_POOL[i]));
                        }
                        Op::Decrement(i) => {
                            let _ = cart.decrement(&pid(ID_POOL[i]));
                        }
                    }
                }

                let payload = serde_json::to_string(cart.items()).unwrap();
                let restored = Cart::hydrate(serde_json::from_str(&payload).unwrap());

                prop_assert_eq!(restored, cart);
            }
        }
    }
}
