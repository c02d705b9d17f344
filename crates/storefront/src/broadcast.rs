//! Value-carrying broadcast primitive for the state containers.
//!
//! A [`Broadcaster`] always holds a current value. Subscribers receive that
//! value immediately on registration and again after every publish, in the
//! order they registered. This is the single state-holding cell behind the
//! session feed, the cart feed, and the notification feed.
//!
//! Listeners run synchronously on the publishing thread, outside the
//! internal lock, so a listener may call back into the broadcaster (for
//! example to read the current value) without deadlocking.

use std::sync::{Arc, Mutex, PoisonError};

/// Handle identifying one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct BroadcasterInner<T> {
    current: T,
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
}

/// A current-value broadcast cell.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct Broadcaster<T> {
    inner: Mutex<BroadcasterInner<T>>,
}

impl<T: Default> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Broadcaster<T> {
    /// Create a broadcaster holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(BroadcasterInner {
                current: initial,
                next_id: 0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Replace the current value and notify all subscribers.
    pub fn publish(&self, value: T)
    where
        T: Clone,
    {
        self.update(|current| {
            *current = value;
            true
        });
    }

    /// Mutate the current value in place under the lock.
    ///
    /// The closure returns whether the value changed; subscribers are only
    /// notified when it returns `true`. Returns the closure's verdict.
    ///
    /// Mutation and any bookkeeping inside `f` happen atomically with
    /// respect to other `update` and `publish` calls.
    pub fn update<F>(&self, f: F) -> bool
    where
        T: Clone,
        F: FnOnce(&mut T) -> bool,
    {
        let (value, listeners) = {
            let mut inner = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !f(&mut inner.current) {
                return false;
            }
            (inner.current.clone(), inner.listeners.clone())
        };
        // Invoke outside the lock so listeners can re-enter.
        for (_, listener) in &listeners {
            listener(&value);
        }
        true
    }

    /// Clone of the current value.
    pub fn current(&self) -> T
    where
        T: Clone,
    {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Register `listener` and immediately invoke it with the current value.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        T: Clone,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let (id, value) = {
            let mut inner = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.listeners.push((id, Arc::clone(&listener)));
            (id, inner.current.clone())
        };
        listener(&value);
        id
    }

    /// Drop the subscription identified by `id`.
    ///
    /// Returns `false` when the id was already removed or never existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}
