//! # Graph Update Subscriptions
//!
//! Synchronous observer lists keyed by graph id.
//!
//! Callbacks run in registration order at the end of each mutating call.
//! A callback that returns an error or panics is logged and skipped; the
//! mutation and the remaining callbacks are unaffected.

use crate::types::Graph;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, TryLockError, Weak};

/// Error type a subscriber may return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

type Callback = Box<dyn FnMut(&Graph) -> Result<(), SubscriberError> + Send>;
type SharedCallback = Arc<Mutex<Callback>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_graph: BTreeMap<String, Vec<(u64, SharedCallback)>>,
}

/// Observer lists shared between the store and outstanding `Subscription`s.
#[derive(Clone, Default)]
pub(crate) struct SubscriberList {
    inner: Arc<Mutex<Registry>>,
}

impl SubscriberList {
    /// Register a callback and return its handle.
    pub(crate) fn add(&self, graph_id: &str, callback: Callback) -> Subscription {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = registry.next_id;
        registry.next_id = registry.next_id.saturating_add(1);
        registry
            .by_graph
            .entry(graph_id.to_string())
            .or_default()
            .push((id, Arc::new(Mutex::new(callback))));

        Subscription {
            id,
            graph_id: graph_id.to_string(),
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live subscribers for a graph.
    pub(crate) fn count(&self, graph_id: &str) -> usize {
        let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        registry.by_graph.get(graph_id).map_or(0, Vec::len)
    }

    /// Invoke every subscriber of `graph.id` with `graph`.
    ///
    /// The registry lock is released before any callback runs, so callbacks
    /// may subscribe or unsubscribe freely.
    pub(crate) fn notify(&self, graph: &Graph) {
        let callbacks: Vec<(u64, SharedCallback)> = {
            let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            match registry.by_graph.get(&graph.id) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for (id, callback) in callbacks {
            invoke(&graph.id, id, &callback, graph);
        }
    }

    /// Invoke a single subscriber (replay-on-subscribe).
    pub(crate) fn notify_one(&self, subscription: &Subscription, graph: &Graph) {
        let callback = {
            let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            registry
                .by_graph
                .get(&subscription.graph_id)
                .and_then(|list| list.iter().find(|(id, _)| *id == subscription.id))
                .map(|(_, cb)| Arc::clone(cb))
        };
        if let Some(callback) = callback {
            invoke(&graph.id, subscription.id, &callback, graph);
        }
    }
}

fn invoke(graph_id: &str, subscriber: u64, callback: &SharedCallback, graph: &Graph) {
    // A callback that re-enters its own notification would deadlock on this
    // lock; skip it instead.
    let mut callback = match callback.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        Err(TryLockError::WouldBlock) => {
            tracing::warn!(graph_id, subscriber, "Subscriber busy, update skipped");
            return;
        }
    };

    let call: &mut Callback = &mut callback;
    match catch_unwind(AssertUnwindSafe(|| call(graph))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(graph_id, subscriber, error = %e, "Subscriber failed");
        }
        Err(_) => {
            tracing::error!(graph_id, subscriber, "Subscriber panicked");
        }
    }
}

// =============================================================================
// SUBSCRIPTION HANDLE
// =============================================================================

/// Handle returned by `GraphStore::subscribe_to_graph_updates`.
///
/// Dropping the handle does NOT unsubscribe; call `unsubscribe`.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    graph_id: String,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// The graph this subscription observes.
    #[must_use]
    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    /// Stop receiving updates. Safe to call any number of times, and after
    /// the store itself is gone.
    pub fn unsubscribe(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = registry.by_graph.get_mut(&self.graph_id) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                registry.by_graph.remove(&self.graph_id);
            }
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("next_id", &self.next_id)
            .field("graphs", &self.by_graph.len())
            .finish()
    }
}
