//! Cart state container.
//!
//! Holds the `(product, quantity)` entry list, persisted under the
//! `shopping_cart` storage key as a versioned envelope and broadcast to
//! subscribers after every mutation. Entries snapshot the product at add
//! time, so later catalog edits never change cart contents.
//!
//! Every mutation is its own persistence unit: the stored entries are
//! reloaded, the change applied, and the result written back before the
//! broadcast. Persistence is best-effort: a failed read or write logs a
//! warning and the in-memory state stays authoritative. A malformed,
//! unversioned, or future-version payload loads as an empty cart, never
//! an error.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use mercadito_core::ProductId;

use crate::api::Product;
use crate::broadcast::{Broadcaster, SubscriptionId};
use crate::storage::{KeyValueStore, keys};

/// Envelope version written by this build.
const CART_VERSION: u32 = 1;

/// Persisted cart payload. The version tag lets old or foreign payloads
/// degrade to an empty cart instead of a parse error.
#[derive(Serialize, Deserialize)]
struct CartEnvelope {
    version: u32,
    entries: Vec<CartEntry>,
}

/// One cart line: a product snapshot and how many of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Product as it was when added.
    pub product: Product,
    /// Number of units; at least 1 while the entry exists.
    pub quantity: u32,
}

impl CartEntry {
    /// Line total at the snapshotted price.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Cart state container.
///
/// One owning instance per process; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    storage: Arc<dyn KeyValueStore>,
    feed: Broadcaster<Vec<CartEntry>>,
}

impl CartStore {
    /// Create a cart container, loading any persisted entries.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let entries = load_entries(storage.as_ref());
        Self {
            inner: Arc::new(CartStoreInner {
                storage,
                feed: Broadcaster::new(entries),
            }),
        }
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing entry for the same product id merges by incrementing its
    /// quantity; otherwise a snapshot of `product` is appended. A zero
    /// quantity is a no-op.
    #[instrument(skip(self, product), fields(product_id = %product.id, quantity))]
    pub fn add(&self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }

        self.inner.feed.update(|entries| {
            self.reload_into(entries);
            match entries
                .iter_mut()
                .find(|entry| entry.product.id == product.id)
            {
                Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
                None => entries.push(CartEntry {
                    product: product.clone(),
                    quantity,
                }),
            }
            self.persist(entries);
            true
        });
    }

    /// Remove the entry for `product_id`.
    ///
    /// Returns `false` without persisting or broadcasting when no entry
    /// matches.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove(&self, product_id: ProductId) -> bool {
        self.inner.feed.update(|entries| {
            self.reload_into(entries);
            let before = entries.len();
            entries.retain(|entry| entry.product.id != product_id);
            if entries.len() == before {
                return false;
            }
            self.persist(entries);
            true
        })
    }

    /// Set the quantity for `product_id` to exactly `quantity`.
    ///
    /// A quantity of zero or less removes the entry. Returns `false`
    /// without persisting or broadcasting when no entry matches.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub fn update_quantity(&self, product_id: ProductId, quantity: i64) -> bool {
        self.inner.feed.update(|entries| {
            self.reload_into(entries);
            let Some(position) = entries
                .iter()
                .position(|entry| entry.product.id == product_id)
            else {
                return false;
            };

            if quantity <= 0 {
                entries.remove(position);
            } else if let Some(entry) = entries.get_mut(position) {
                entry.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            }

            self.persist(entries);
            true
        })
    }

    /// Empty the cart. Always persists and broadcasts.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.inner.feed.update(|entries| {
            entries.clear();
            self.persist(entries);
            true
        });
    }

    /// Snapshot of the current entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<CartEntry> {
        self.inner.feed.current()
    }

    /// Sum of all entry quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner
            .feed
            .current()
            .iter()
            .map(|entry| u64::from(entry.quantity))
            .sum()
    }

    /// Sum of `price * quantity` over all entries, at snapshotted prices.
    ///
    /// Computed independently of [`item_count`](Self::item_count).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.inner
            .feed
            .current()
            .iter()
            .map(CartEntry::subtotal)
            .sum()
    }

    /// Register a listener; it immediately receives the current entries.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Vec<CartEntry>) + Send + Sync + 'static,
    {
        self.inner.feed.subscribe(listener)
    }

    /// Drop a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.feed.unsubscribe(id)
    }

    /// Refresh `entries` from storage before applying a mutation.
    ///
    /// An unreadable store keeps the in-memory snapshot authoritative.
    fn reload_into(&self, entries: &mut Vec<CartEntry>) {
        match self.inner.storage.get(keys::SHOPPING_CART) {
            Ok(Some(raw)) => *entries = parse_entries(&raw),
            Ok(None) => entries.clear(),
            Err(err) => warn!(error = %err, "cart read failed, keeping in-memory state"),
        }
    }

    fn persist(&self, entries: &[CartEntry]) {
        let envelope = CartEnvelope {
            version: CART_VERSION,
            entries: entries.to_vec(),
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => {
                if let Err(err) = self.inner.storage.set(keys::SHOPPING_CART, &json) {
                    warn!(error = %err, "cart persist failed, keeping in-memory state");
                }
            }
            Err(err) => warn!(error = %err, "cart serialization failed"),
        }
    }
}

fn load_entries(storage: &dyn KeyValueStore) -> Vec<CartEntry> {
    match storage.get(keys::SHOPPING_CART) {
        Ok(Some(raw)) => parse_entries(&raw),
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!(error = %err, "cart read failed, starting empty");
            Vec::new()
        }
    }
}

fn parse_entries(raw: &str) -> Vec<CartEntry> {
    match serde_json::from_str::<CartEnvelope>(raw) {
        Ok(envelope) if envelope.version == CART_VERSION => envelope.entries,
        Ok(envelope) => {
            warn!(
                version = envelope.version,
                "unsupported cart version, starting empty"
            );
            Vec::new()
        }
        Err(err) => {
            warn!(error = %err, "malformed cart payload, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use mercadito_core::CategoryId;

    use crate::api::Category;
    use crate::storage::{MemoryStore, StorageError};

    use super::*;

    /// Store whose reads fail on demand.
    #[derive(Default)]
    struct FailingReads {
        inner: MemoryStore,
        fail_reads: AtomicBool,
    }

    impl KeyValueStore for FailingReads {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("read failed")));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn product(id: i64, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price,
            description: "A product".to_owned(),
            category: Category {
                id: CategoryId::new(1),
                name: "Clothes".to_owned(),
                image: "https://example.com/clothes.jpg".to_owned(),
            },
            images: vec![format!("https://example.com/{id}.jpg")],
        }
    }

    fn cart() -> (CartStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let cart = CartStore::new(Arc::clone(&storage) as Arc<dyn KeyValueStore>);
        (cart, storage)
    }

    fn broadcast_counter(cart: &CartStore) -> Arc<Mutex<usize>> {
        let count = Arc::new(Mutex::new(0));
        let count_clone = Arc::clone(&count);
        cart.subscribe(move |_| *count_clone.lock().unwrap() += 1);
        // Discount the immediate delivery on subscribe.
        *count.lock().unwrap() = 0;
        count
    }

    #[test]
    fn test_add_merges_entries_by_product_id() {
        let (cart, _) = cart();
        let mug = product(1, Decimal::new(1050, 2));
        let plate = product(2, Decimal::new(300, 2));

        cart.add(&mug, 1);
        cart.add(&plate, 1);
        cart.add(&mug, 2);

        let entries = cart.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product.id, ProductId::new(1));
        assert_eq!(entries[0].quantity, 3);
        assert_eq!(entries[1].product.id, ProductId::new(2));
    }

    #[test]
    fn test_add_zero_quantity_is_noop() {
        let (cart, _) = cart();
        let broadcasts = broadcast_counter(&cart);

        cart.add(&product(1, Decimal::ONE), 0);

        assert!(cart.entries().is_empty());
        assert_eq!(*broadcasts.lock().unwrap(), 0);
    }

    #[test]
    fn test_add_snapshots_product_state() {
        let (cart, _) = cart();
        let mut mug = product(1, Decimal::new(1000, 2));
        cart.add(&mug, 1);

        // A later catalog edit must not reach into the cart.
        mug.price = Decimal::new(9999, 2);

        assert_eq!(cart.total(), Decimal::new(1000, 2));
    }

    #[test]
    fn test_remove_deletes_matching_entry() {
        let (cart, _) = cart();
        cart.add(&product(1, Decimal::ONE), 1);
        cart.add(&product(2, Decimal::ONE), 1);

        assert!(cart.remove(ProductId::new(1)));

        let entries = cart.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product.id, ProductId::new(2));
    }

    #[test]
    fn test_remove_absent_id_is_silent_noop() {
        let (cart, _) = cart();
        cart.add(&product(1, Decimal::ONE), 1);
        let broadcasts = broadcast_counter(&cart);

        assert!(!cart.remove(ProductId::new(42)));
        assert_eq!(cart.entries().len(), 1);
        assert_eq!(*broadcasts.lock().unwrap(), 0);
    }

    #[test]
    fn test_update_quantity_sets_absolute_value() {
        let (cart, _) = cart();
        cart.add(&product(1, Decimal::ONE), 5);

        assert!(cart.update_quantity(ProductId::new(1), 2));

        assert_eq!(cart.entries()[0].quantity, 2);
    }

    #[test]
    fn test_update_quantity_zero_or_negative_removes() {
        let (cart, _) = cart();
        cart.add(&product(1, Decimal::ONE), 5);
        cart.add(&product(2, Decimal::ONE), 5);

        assert!(cart.update_quantity(ProductId::new(1), 0));
        assert!(cart.update_quantity(ProductId::new(2), -3));

        assert!(cart.entries().is_empty());
    }

    #[test]
    fn test_update_quantity_absent_id_is_noop() {
        let (cart, _) = cart();
        let broadcasts = broadcast_counter(&cart);

        assert!(!cart.update_quantity(ProductId::new(42), 3));
        assert_eq!(*broadcasts.lock().unwrap(), 0);
    }

    #[test]
    fn test_clear_broadcasts_even_when_already_empty() {
        let (cart, _) = cart();
        let broadcasts = broadcast_counter(&cart);

        cart.clear();

        assert!(cart.entries().is_empty());
        assert_eq!(*broadcasts.lock().unwrap(), 1);
    }

    #[test]
    fn test_count_and_total_are_computed_independently() {
        let (cart, _) = cart();
        cart.add(&product(1, Decimal::new(1050, 2)), 2);
        cart.add(&product(2, Decimal::new(300, 2)), 1);

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Decimal::new(2400, 2));
    }

    #[test]
    fn test_round_trip_across_restart() {
        let storage = Arc::new(MemoryStore::new());

        {
            let cart = CartStore::new(Arc::clone(&storage) as Arc<dyn KeyValueStore>);
            cart.add(&product(1, Decimal::new(1050, 2)), 2);
            cart.add(&product(2, Decimal::new(300, 2)), 1);
        }

        let reloaded = CartStore::new(storage as Arc<dyn KeyValueStore>);
        let entries = reloaded.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product.id, ProductId::new(1));
        assert_eq!(entries[0].quantity, 2);
        assert_eq!(reloaded.total(), Decimal::new(2400, 2));
    }

    #[test]
    fn test_mutations_reload_the_stored_entries() {
        let (cart, storage) = cart();
        cart.add(&product(1, Decimal::ONE), 1);

        // A foreign writer replaces the stored cart between calls.
        let foreign = CartEnvelope {
            version: CART_VERSION,
            entries: vec![CartEntry {
                product: product(7, Decimal::ONE),
                quantity: 4,
            }],
        };
        storage
            .set(
                keys::SHOPPING_CART,
                &serde_json::to_string(&foreign).unwrap(),
            )
            .unwrap();

        cart.add(&product(1, Decimal::ONE), 1);

        let entries = cart.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product.id, ProductId::new(7));
        assert_eq!(entries[0].quantity, 4);
        assert_eq!(entries[1].product.id, ProductId::new(1));
        assert_eq!(entries[1].quantity, 1);
    }

    #[test]
    fn test_read_failure_mid_mutation_keeps_in_memory_state() {
        let storage = Arc::new(FailingReads::default());
        let cart = CartStore::new(Arc::clone(&storage) as Arc<dyn KeyValueStore>);
        cart.add(&product(1, Decimal::ONE), 2);

        storage.fail_reads.store(true, Ordering::SeqCst);
        cart.add(&product(2, Decimal::ONE), 1);

        let entries = cart.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].quantity, 2);
        assert_eq!(entries[1].product.id, ProductId::new(2));
    }

    #[test]
    fn test_malformed_payload_loads_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::SHOPPING_CART, "not json {{").unwrap();

        let cart = CartStore::new(storage as Arc<dyn KeyValueStore>);

        assert!(cart.entries().is_empty());
    }

    #[test]
    fn test_legacy_unversioned_payload_loads_empty() {
        let storage = Arc::new(MemoryStore::new());
        // Bare entry array from before the envelope existed.
        storage
            .set(keys::SHOPPING_CART, r#"[{"product": {}, "quantity": 1}]"#)
            .unwrap();

        let cart = CartStore::new(storage as Arc<dyn KeyValueStore>);

        assert!(cart.entries().is_empty());
    }

    #[test]
    fn test_future_version_payload_loads_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(keys::SHOPPING_CART, r#"{"version": 2, "entries": []}"#)
            .unwrap();

        let cart = CartStore::new(storage as Arc<dyn KeyValueStore>);

        assert!(cart.entries().is_empty());
    }

    #[test]
    fn test_mutations_broadcast_to_subscribers() {
        let (cart, _) = cart();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        cart.subscribe(move |entries| {
            seen_clone.lock().unwrap().push(entries.len());
        });

        cart.add(&product(1, Decimal::ONE), 1);
        cart.add(&product(2, Decimal::ONE), 1);
        cart.remove(ProductId::new(1));

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 1]);
    }
}
