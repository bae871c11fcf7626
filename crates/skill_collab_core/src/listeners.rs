//! Ordered listener registry.
//!
//! [`ListenerRegistry`] backs every callback set in the crate: remote-text
//! subscribers of a document, sync handlers of a file, and session event
//! subscribers. Listeners run in registration order, and they are invoked
//! on a snapshot taken after the internal lock is released, so a listener may
//! subscribe or unsubscribe without deadlocking.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A unique identifier for a subscription.
pub type ListenerId = u64;

/// Thread-safe, registration-ordered set of callbacks taking `&E`.
pub struct ListenerRegistry<E: ?Sized> {
    listeners: RwLock<BTreeMap<ListenerId, Arc<dyn Fn(&E) + Send + Sync>>>,
    next_id: AtomicU64,
}

impl<E: ?Sized> ListenerRegistry<E> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener. Returns an id for [`ListenerRegistry::unsubscribe`].
    pub fn subscribe(&self, listener: Arc<dyn Fn(&E) + Send + Sync>) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut listeners = self.listeners.write().unwrap();
        listeners.insert(id, listener);
        id
    }

    /// Remove a listener.
    ///
    /// Returns `true` if the subscription was found and removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap();
        listeners.remove(&id).is_some()
    }

    /// Invoke every listener once, in registration order.
    ///
    /// A panicking listener does not prevent the others from running.
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<_> = {
            let listeners = self.listeners.read().unwrap();
            listeners.values().cloned().collect()
        };

        for listener in &snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(event);
            }));
            if result.is_err() {
                log::warn!("[Listeners] listener panicked, continuing with the rest");
            }
        }
        snapshot.len()
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.listeners.read().unwrap().len()
    }

    /// Check if there are no active subscriptions.
    pub fn is_empty(&self) -> bool {
        self.listeners.read().unwrap().is_empty()
    }

    /// Drop all subscriptions.
    pub fn clear(&self) {
        self.listeners.write().unwrap().clear();
    }
}

impl<E: ?Sized> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> std::fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.len())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish()
    }
}
