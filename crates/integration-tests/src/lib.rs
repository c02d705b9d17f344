//! Shared fixtures for Mercadito integration tests.
//!
//! Provides a [`TestContext`] that wires the real application state over
//! fake backends: a scriptable auth service, a recording navigator, and
//! an in-memory or file-backed storage.
//!
//! # Example
//!
//! ```rust,ignore
//! use mercadito_integration_tests::{TestContext, TEST_EMAIL, TEST_PASSWORD};
//! use mercadito_storefront::api::Credentials;
//!
//! #[tokio::test]
//! async fn test_login() {
//!     let ctx = TestContext::new();
//!     ctx.state
//!         .session()
//!         .login(&Credentials::new(TEST_EMAIL, TEST_PASSWORD))
//!         .await
//!         .expect("login should succeed");
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;

use mercadito_core::{CategoryId, Email, ProductId, Role, UserId};
use mercadito_storefront::api::{
    ApiError, AuthApi, Category, Credentials, Product, TokenPair, User,
};
use mercadito_storefront::config::StorefrontConfig;
use mercadito_storefront::guard::Navigator;
use mercadito_storefront::state::AppState;
use mercadito_storefront::storage::{KeyValueStore, MemoryStore};

/// Email the fake auth service accepts.
pub const TEST_EMAIL: &str = "maria@example.com";
/// Password the fake auth service accepts.
pub const TEST_PASSWORD: &str = "password123";
/// Access token issued by the fake auth service.
pub const TEST_ACCESS_TOKEN: &str = "access-token-1";
/// Refresh token issued by the fake auth service.
pub const TEST_REFRESH_TOKEN: &str = "refresh-token-1";

// =============================================================================
// Fake Auth Service
// =============================================================================

/// How the fake auth service responds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBehavior {
    /// Accept [`TEST_EMAIL`]/[`TEST_PASSWORD`] and the issued token.
    Normal,
    /// Answer every call with `401 Unauthorized`.
    RejectAll,
    /// Answer every call with `500 Internal Server Error`.
    Unreachable,
}

/// Scriptable stand-in for the remote auth endpoints.
pub struct FakeAuthService {
    behavior: AuthBehavior,
    login_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl FakeAuthService {
    #[must_use]
    pub fn new(behavior: AuthBehavior) -> Self {
        Self {
            behavior,
            login_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
        }
    }

    /// Number of login requests received.
    #[must_use]
    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Number of profile requests received.
    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

fn unauthorized() -> ApiError {
    ApiError::Status {
        status: reqwest::StatusCode::UNAUTHORIZED,
        body: "Unauthorized".to_owned(),
    }
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: String::new(),
    }
}

#[async_trait]
impl AuthApi for FakeAuthService {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            AuthBehavior::Unreachable => Err(server_error()),
            AuthBehavior::RejectAll => Err(unauthorized()),
            AuthBehavior::Normal => {
                if credentials.email == TEST_EMAIL
                    && credentials.password.expose_secret() == TEST_PASSWORD
                {
                    Ok(TokenPair {
                        access_token: TEST_ACCESS_TOKEN.to_owned(),
                        refresh_token: TEST_REFRESH_TOKEN.to_owned(),
                    })
                } else {
                    Err(unauthorized())
                }
            }
        }
    }

    async fn profile(&self, access_token: &str) -> Result<User, ApiError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            AuthBehavior::Unreachable => Err(server_error()),
            AuthBehavior::RejectAll => Err(unauthorized()),
            AuthBehavior::Normal => {
                if access_token == TEST_ACCESS_TOKEN {
                    Ok(test_user())
                } else {
                    Err(unauthorized())
                }
            }
        }
    }
}

// =============================================================================
// Recording Navigator
// =============================================================================

/// Navigator that records every requested route.
#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes navigated to, in order.
    #[must_use]
    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_owned());
    }
}

// =============================================================================
// Test Context
// =============================================================================

/// Everything a test needs to drive the storefront end to end.
pub struct TestContext {
    pub state: AppState,
    pub storage: Arc<dyn KeyValueStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub auth: Arc<FakeAuthService>,
}

impl TestContext {
    /// In-memory context with a cooperative auth service.
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(AuthBehavior::Normal)
    }

    /// In-memory context with the given auth behavior.
    #[must_use]
    pub fn with_behavior(behavior: AuthBehavior) -> Self {
        Self::over_storage(Arc::new(MemoryStore::new()), behavior)
    }

    /// Context over existing storage, simulating an app restart.
    #[must_use]
    pub fn over_storage(storage: Arc<dyn KeyValueStore>, behavior: AuthBehavior) -> Self {
        let navigator = Arc::new(RecordingNavigator::new());
        let auth = Arc::new(FakeAuthService::new(behavior));
        let state = AppState::with_auth_api(
            StorefrontConfig::default(),
            Arc::clone(&storage),
            Arc::clone(&auth) as Arc<dyn AuthApi>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        );

        Self {
            state,
            storage,
            navigator,
            auth,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Builders
// =============================================================================

/// The profile the fake auth service returns for the test user.
#[must_use]
pub fn test_user() -> User {
    User {
        id: UserId::new(7),
        email: Email::parse(TEST_EMAIL).expect("test email literal is valid"),
        name: "Maria".to_owned(),
        role: Role::Customer,
        avatar: "https://example.com/avatars/maria.png".to_owned(),
        is_guest: false,
    }
}

/// Credentials the fake auth service accepts.
#[must_use]
pub fn valid_credentials() -> Credentials {
    Credentials::new(TEST_EMAIL, TEST_PASSWORD)
}

/// Catalog category with the given id and name.
#[must_use]
pub fn category(id: i64, name: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        name: name.to_owned(),
        image: format!("https://example.com/categories/{id}.jpg"),
    }
}

/// Catalog product with the given id, title, and price in cents.
#[must_use]
pub fn product(id: i64, title: &str, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_owned(),
        price: Decimal::new(cents, 2),
        description: format!("{title} description"),
        category: category(1, "Ropa"),
        images: vec![format!("https://example.com/products/{id}.jpg")],
    }
}
