//! Synchronous event subscribers.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

use crate::event::PermissionEvent;

/// Handle for one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A callback invoked inline for every published event.
///
/// Implementations must not block and must not publish to the same bus.
pub trait EventSubscriber: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &PermissionEvent);
}

impl<F> EventSubscriber for F
where
    F: Fn(&PermissionEvent) + Send + Sync,
{
    fn on_event(&self, event: &PermissionEvent) {
        self(event);
    }
}

/// Callbacks run inline by [`crate::EventBus::publish`].
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Arc<dyn EventSubscriber>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// No callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `subscriber`; the id removes it again.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId::new();
        self.subscribers.insert(id, subscriber);
        id
    }

    /// Remove a subscriber. Returns `true` if it was registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Call every subscriber with `event`.
    pub(crate) fn notify(&self, event: &PermissionEvent) {
        // Snapshot first so a subscriber may (un)register without deadlocking
        // on the map's shard locks.
        let subscribers: Vec<Arc<dyn EventSubscriber>> = self
            .subscribers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        trace!(count = subscribers.len(), "running inline subscribers");
        for subscriber in subscribers {
            subscriber.on_event(event);
        }
    }
}
