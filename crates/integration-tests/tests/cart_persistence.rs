//! Integration tests for cart persistence in the state file.
//!
//! These run the real `FileStore` over a temp directory and rebuild the
//! application state between steps to prove cart contents survive a process
//! restart and degrade cleanly when the stored payload is bad.

use std::path::Path;
use std::sync::Arc;

use mercadito_core::ProductId;
use mercadito_integration_tests::{AuthBehavior, TEST_ACCESS_TOKEN, TestContext, product};
use mercadito_storefront::guard::AccessLevel;
use mercadito_storefront::storage::{FileStore, KeyValueStore, keys};
use rust_decimal::Decimal;

fn open_file_storage(path: &Path) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStore::open(path).expect("state file should open"))
}

#[tokio::test]
async fn test_cart_round_trips_through_state_file() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("mercadito.json");

    {
        let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
        ctx.state.cart().add(&product(1, "Poncho", 4990), 2);
        ctx.state.cart().add(&product(2, "Sombrero", 2550), 1);
    }

    let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
    let entries = ctx.state.cart().entries();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].product.id, ProductId::new(1));
    assert_eq!(entries[0].quantity, 2);
    assert_eq!(entries[0].product.title, "Poncho");
    assert_eq!(ctx.state.cart().item_count(), 3);
    assert_eq!(ctx.state.cart().total(), Decimal::new(12530, 2));
}

#[tokio::test]
async fn test_cart_mutations_persist_across_restart() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("mercadito.json");

    {
        let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
        ctx.state.cart().add(&product(1, "Poncho", 4990), 2);
        ctx.state.cart().add(&product(2, "Sombrero", 2550), 4);
        assert!(ctx.state.cart().update_quantity(ProductId::new(2), 1));
        assert!(ctx.state.cart().remove(ProductId::new(1)));
    }

    let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
    let entries = ctx.state.cart().entries();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].product.id, ProductId::new(2));
    assert_eq!(entries[0].quantity, 1);
}

#[tokio::test]
async fn test_clear_persists_emptiness() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("mercadito.json");

    {
        let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
        ctx.state.cart().add(&product(1, "Poncho", 4990), 2);
        ctx.state.cart().clear();
    }

    let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);

    assert!(ctx.state.cart().entries().is_empty());
    let stored = ctx
        .storage
        .get(keys::SHOPPING_CART)
        .expect("storage read should succeed")
        .expect("cleared cart should still be stored");
    assert!(stored.contains(r#""entries":[]"#));
}

#[tokio::test]
async fn test_corrupt_cart_value_spares_the_session() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("mercadito.json");

    {
        let storage = open_file_storage(&path);
        storage
            .set(keys::ACCESS_TOKEN, TEST_ACCESS_TOKEN)
            .expect("storage write should succeed");
        storage
            .set(keys::SHOPPING_CART, "{ definitely not a cart")
            .expect("storage write should succeed");
    }

    let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
    ctx.state.initialize().await;

    // The bad cart payload degrades to empty without touching the session
    assert!(ctx.state.cart().entries().is_empty());
    assert_eq!(ctx.state.session().access_level(), AccessLevel::Full);
}

#[tokio::test]
async fn test_future_cart_version_loads_empty_then_rewrites() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("mercadito.json");

    {
        let storage = open_file_storage(&path);
        storage
            .set(keys::SHOPPING_CART, r#"{"version": 7, "entries": []}"#)
            .expect("storage write should succeed");
    }

    let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
    assert!(ctx.state.cart().entries().is_empty());

    // The next mutation replaces the foreign payload with the current version
    ctx.state.cart().add(&product(1, "Poncho", 4990), 1);
    let stored = ctx
        .storage
        .get(keys::SHOPPING_CART)
        .expect("storage read should succeed")
        .expect("cart should be stored after add");
    assert!(stored.contains(r#""version":1"#));
}

#[tokio::test]
async fn test_unreadable_state_file_starts_fresh() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("mercadito.json");
    std::fs::write(&path, "*** not json ***").expect("file write should succeed");

    let ctx = TestContext::over_storage(open_file_storage(&path), AuthBehavior::Normal);
    ctx.state.initialize().await;

    assert!(ctx.state.cart().entries().is_empty());
    assert_eq!(
        ctx.state.session().access_level(),
        AccessLevel::Unauthenticated
    );
}
