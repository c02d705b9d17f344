//! Transient notification stream.
//!
//! A process-wide queue of short-lived messages driving UI alerts. Every
//! notification self-destructs after its display duration via a spawned
//! timer task; manual dismissal cancels the timer. Removal is idempotent,
//! so a timer and a manual dismissal racing on the same id is harmless.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use mercadito_core::NotificationId;

use crate::broadcast::{Broadcaster, SubscriptionId};

/// How long a notification stays visible by default.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Monotonically increasing per process lifetime.
    pub id: NotificationId,
    /// Message text.
    pub message: String,
    /// Severity tag.
    pub severity: Severity,
}

/// Notification stream.
///
/// One owning instance per process; clones share state. Dropping the last
/// clone aborts all outstanding expiry timers.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicI64,
    feed: Broadcaster<Vec<Notification>>,
    timers: Mutex<HashMap<NotificationId, JoinHandle<()>>>,
}

impl Notifier {
    /// Create an empty notification stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a notification for `duration`, returning its id.
    ///
    /// The id can be passed to [`remove`](Self::remove) to dismiss early.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime; the expiry timer needs
    /// one to run on.
    pub fn show(
        &self,
        message: impl Into<String>,
        severity: Severity,
        duration: Duration,
    ) -> NotificationId {
        let id = NotificationId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let notification = Notification {
            id,
            message: message.into(),
            severity,
        };

        self.inner.feed.update(|notifications| {
            notifications.push(notification.clone());
            true
        });

        // Holding the timers lock until the handle is stored keeps a
        // zero-duration timer from firing before its handle is tracked.
        let mut timers = self
            .inner
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                inner.dismiss(id);
            }
        });
        timers.insert(id, handle);

        id
    }

    /// Show a success notification for the default duration.
    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Success, DEFAULT_DURATION)
    }

    /// Show an error notification for the default duration.
    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Error, DEFAULT_DURATION)
    }

    /// Show a warning notification for the default duration.
    pub fn warning(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Warning, DEFAULT_DURATION)
    }

    /// Show an info notification for the default duration.
    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.show(message, Severity::Info, DEFAULT_DURATION)
    }

    /// Dismiss a notification early, cancelling its expiry timer.
    ///
    /// Returns `false` when the id is already gone; dismissing twice is
    /// safe.
    pub fn remove(&self, id: NotificationId) -> bool {
        self.inner.dismiss(id)
    }

    /// Snapshot of the live notifications, in creation order.
    #[must_use]
    pub fn active(&self) -> Vec<Notification> {
        self.inner.feed.current()
    }

    /// Register a listener; it immediately receives the live notifications.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Vec<Notification>) + Send + Sync + 'static,
    {
        self.inner.feed.subscribe(listener)
    }

    /// Drop a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.feed.unsubscribe(id)
    }
}

impl NotifierInner {
    /// Remove `id` from the live list and its timer from the table.
    ///
    /// Called by both the expiry timer and manual dismissal; whichever runs
    /// second finds nothing left and does not broadcast. Aborting an
    /// already-finished timer is a no-op.
    fn dismiss(&self, id: NotificationId) -> bool {
        if let Some(handle) = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
        {
            handle.abort();
        }

        self.feed.update(|notifications| {
            let before = notifications.len();
            notifications.retain(|notification| notification.id != id);
            notifications.len() != before
        })
    }
}

impl Drop for NotifierInner {
    fn drop(&mut self) {
        let timers = self
            .timers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for handle in timers.values() {
            handle.abort();
        }
    }
}
