//! Application state wiring the storefront services together.

use std::sync::Arc;

use tracing::instrument;

use crate::api::{ApiClient, AuthApi};
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::guard::{Navigator, paths};
use crate::notify::Notifier;
use crate::session::SessionStore;
use crate::storage::{FileStore, KeyValueStore, StorageError};

/// Application state shared across the storefront.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared services like the session, cart, and notification stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    session: SessionStore,
    cart: CartStore,
    notifier: Notifier,
    navigator: Arc<dyn Navigator>,
}

impl AppState {
    /// Create a new application state backed by the configured state file.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `navigator` - Navigation sink for redirects
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but cannot be read.
    pub fn new(
        config: StorefrontConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, StorageError> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage_path)?);
        Ok(Self::with_storage(config, storage, navigator))
    }

    /// Create application state over an explicit storage backend.
    #[must_use]
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let api = ApiClient::new(&config);
        let auth: Arc<dyn AuthApi> = Arc::new(api.clone());
        Self::assemble(config, api, storage, auth, navigator)
    }

    /// Create application state with a custom auth backend.
    ///
    /// Lets tests fake the remote auth service while keeping the rest of
    /// the wiring real.
    #[must_use]
    pub fn with_auth_api(
        config: StorefrontConfig,
        storage: Arc<dyn KeyValueStore>,
        auth: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let api = ApiClient::new(&config);
        Self::assemble(config, api, storage, auth, navigator)
    }

    fn assemble(
        config: StorefrontConfig,
        api: ApiClient,
        storage: Arc<dyn KeyValueStore>,
        auth: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = SessionStore::new(Arc::clone(&storage), auth, Arc::clone(&navigator));
        let cart = CartStore::new(storage);
        let notifier = Notifier::new();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                session,
                cart,
                notifier,
                navigator,
            }),
        }
    }

    /// Restore the session recorded in storage.
    ///
    /// See [`SessionStore::initialize`].
    pub async fn initialize(&self) {
        self.inner.session.initialize().await;
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the notification stream.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Complete a purchase of the current cart contents.
    ///
    /// An empty cart produces a warning notification and nothing else.
    /// Otherwise a success notification is shown, the cart is emptied,
    /// and navigation returns to the catalog listing.
    #[instrument(skip(self))]
    pub fn checkout(&self) {
        if self.inner.cart.entries().is_empty() {
            self.inner.notifier.warning("El carrito está vacío");
            return;
        }

        self.inner.notifier.success("¡Compra realizada con éxito!");
        self.inner.cart.clear();
        self.inner.navigator.navigate(paths::PRODUCTS);
    }

    /// Discard the current cart contents without purchasing.
    #[instrument(skip(self))]
    pub fn empty_cart(&self) {
        self.inner.cart.clear();
        self.inner.notifier.info("Carrito vaciado");
    }
}
