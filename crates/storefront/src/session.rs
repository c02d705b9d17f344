//! Session state container.
//!
//! Holds the current identity (authenticated user, guest sentinel, or none),
//! derived from stored tokens or the guest marker, and broadcasts every
//! change to subscribers. The routing guard consumes it through
//! [`SessionStore::access_level`].
//!
//! Only [`SessionStore::login`] surfaces errors. The silent profile refresh
//! treats every failure as "not authenticated" and resets the session
//! instead of reporting.

use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{instrument, warn};

use mercadito_core::Email;

use crate::api::{ApiError, AuthApi, Credentials, User};
use crate::broadcast::{Broadcaster, SubscriptionId};
use crate::guard::{AccessLevel, Navigator, paths};
use crate::storage::{KeyValueStore, keys};

/// Minimum password length accepted by the login form.
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] mercadito_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Credentials rejected by the auth service.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The auth service could not be reached or answered abnormally.
    #[error("auth service error: {0}")]
    Api(#[from] ApiError),
}

/// Session state container.
///
/// One owning instance per process; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    storage: Arc<dyn KeyValueStore>,
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    feed: Broadcaster<Option<User>>,
}

impl SessionStore {
    /// Create a session container.
    ///
    /// Nothing is read from storage until [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                storage,
                api,
                navigator,
                feed: Broadcaster::new(None),
            }),
        }
    }

    /// Restore the session from storage.
    ///
    /// Runs once per process start, before any view renders. The guest
    /// marker outranks a stale token; the token path fetches the profile and
    /// self-heals on failure.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        if self.read_key(keys::GUEST_MODE).as_deref() == Some("true") {
            self.inner.feed.publish(Some(User::guest()));
            return;
        }

        if self.read_key(keys::ACCESS_TOKEN).is_some() {
            self.load_profile().await;
        } else {
            self.inner.feed.publish(None);
        }
    }

    /// Log in with email and password.
    ///
    /// Validates locally before any network call, then exchanges the
    /// credentials, clears the guest marker, persists the token pair, and
    /// fetches the profile. The profile fetch outcome does not affect the
    /// return value; its failure path is [`load_profile`](Self::load_profile)'s
    /// self-healing logout.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` when
    /// local validation fails, `AuthError::InvalidCredentials` when the
    /// service rejects the login, and `AuthError::Api` on transport
    /// failures. The session is unchanged on any error.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        // Validate before any network call
        Email::parse(&credentials.email)?;
        validate_password(credentials.password.expose_secret())?;

        let tokens = self.inner.api.login(credentials).await.map_err(|e| {
            if e.is_unauthorized() {
                AuthError::InvalidCredentials
            } else {
                AuthError::Api(e)
            }
        })?;

        self.remove_key(keys::GUEST_MODE);
        self.store_key(keys::ACCESS_TOKEN, &tokens.access_token);
        self.store_key(keys::REFRESH_TOKEN, &tokens.refresh_token);

        self.load_profile().await;

        Ok(())
    }

    /// Enter guest mode.
    ///
    /// Clears stored tokens, writes the guest marker, and broadcasts the
    /// guest sentinel. No network call; cannot fail.
    #[instrument(skip(self))]
    pub fn login_as_guest(&self) {
        self.remove_key(keys::ACCESS_TOKEN);
        self.remove_key(keys::REFRESH_TOKEN);
        self.store_key(keys::GUEST_MODE, "true");
        self.inner.feed.publish(Some(User::guest()));
    }

    /// Refresh the identity from the stored access token.
    ///
    /// An absent token resets the session in place. A failed fetch invokes
    /// [`logout`](Self::logout): an invalid or expired token means "not
    /// authenticated", never an error surfaced to the caller.
    #[instrument(skip(self))]
    pub async fn load_profile(&self) {
        let Some(token) = self.read_key(keys::ACCESS_TOKEN) else {
            self.inner.feed.publish(None);
            return;
        };

        match self.inner.api.profile(&token).await {
            Ok(user) => self.inner.feed.publish(Some(user)),
            Err(err) => {
                warn!(error = %err, "profile fetch failed, clearing session");
                self.logout();
            }
        }
    }

    /// Clear all stored session state and navigate to the login page.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.remove_key(keys::ACCESS_TOKEN);
        self.remove_key(keys::REFRESH_TOKEN);
        self.remove_key(keys::GUEST_MODE);
        self.inner.feed.publish(None);
        self.inner.navigator.navigate(paths::LOGIN);
    }

    /// Whether a login session or guest session is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_key(keys::ACCESS_TOKEN).is_some() || self.is_guest()
    }

    /// Whether the guest sentinel is the current identity.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.inner.feed.current().is_some_and(|user| user.is_guest)
    }

    /// Clone of the current identity.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.feed.current()
    }

    /// Access level consumed by the routing guard.
    #[must_use]
    pub fn access_level(&self) -> AccessLevel {
        if self.is_guest() {
            AccessLevel::Guest
        } else if self.is_authenticated() {
            AccessLevel::Full
        } else {
            AccessLevel::Unauthenticated
        }
    }

    /// Register a listener; it immediately receives the current identity.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Option<User>) + Send + Sync + 'static,
    {
        self.inner.feed.subscribe(listener)
    }

    /// Drop a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.feed.unsubscribe(id)
    }

    // Storage failures degrade to "not persisted" instead of failing the
    // session operation.

    fn read_key(&self, key: &str) -> Option<String> {
        match self.inner.storage.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "storage read failed");
                None
            }
        }
    }

    fn store_key(&self, key: &str, value: &str) {
        if let Err(err) = self.inner.storage.set(key, value) {
            warn!(key, error = %err, "storage write failed");
        }
    }

    fn remove_key(&self, key: &str) {
        if let Err(err) = self.inner.storage.remove(key) {
            warn!(key, error = %err, "storage remove failed");
        }
    }
}

/// Validate password meets the login form requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}
