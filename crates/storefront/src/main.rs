//! Mercadito storefront demo binary.
//!
//! Drives the storefront library through a short guest shopping session
//! against the live catalog service.
//!
//! # Architecture
//!
//! - `AppState` wires config, state file, API client, and the session,
//!   cart, and notification containers
//! - Session restore runs first; without a stored identity the demo
//!   continues as a guest
//! - Notifications are observed through a feed subscription, the same way
//!   a toast container in a view layer would consume them
//! - Cart contents persist in the state file between runs

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use mercadito_storefront::config::StorefrontConfig;
use mercadito_storefront::guard::{self, GuardOutcome, Navigator, paths};
use mercadito_storefront::notify;
use mercadito_storefront::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Navigator that records route changes in the log instead of a UI.
struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "navigate");
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mercadito_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    let state = AppState::new(config, Arc::new(LogNavigator))
        .expect("Failed to initialize application state");

    // Surface notifications in the log the way a toast container would
    state.notifier().subscribe(|notifications| {
        if let Some(latest) = notifications.last() {
            tracing::info!(severity = ?latest.severity, "{}", latest.message);
        }
    });

    // Restore whatever session the state file records
    state.initialize().await;
    if !state.session().is_authenticated() {
        state.session().login_as_guest();
    }
    if let Some(user) = state.session().current_user() {
        tracing::info!(user = %user.name, guest = user.is_guest, "session ready");
    }

    // Browse the first catalog page and put something in the cart
    match state.api().list_products(Some(5), Some(0)).await {
        Ok(products) => {
            tracing::info!(count = products.len(), "catalog page loaded");
            if let Some(product) = products.first() {
                tracing::info!(
                    title = %product.title,
                    image = %product.primary_image(),
                    "adding to cart"
                );
                state.cart().add(product, 2);
                state.notifier().success("Producto agregado al carrito");
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "catalog unreachable, continuing with the stored cart");
        }
    }

    tracing::info!(
        items = state.cart().item_count(),
        total = %state.cart().total(),
        "cart contents"
    );

    // Guests may fill the cart but not open the checkout page
    match guard::check_navigation(state.session().access_level(), paths::CART) {
        GuardOutcome::Allow => state.checkout(),
        GuardOutcome::RedirectToCatalog => {
            tracing::info!("guests cannot check out, cart kept for the next session");
        }
        GuardOutcome::RedirectToLogin { return_to } => {
            tracing::info!(return_to, "sign in to continue");
        }
    }

    // Let the last toast expire before exiting
    tokio::time::sleep(notify::DEFAULT_DURATION).await;
}
