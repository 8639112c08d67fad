//! Fan-out of committed permission changes.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace, warn};
use warden_core::Address;

use crate::event::PermissionEvent;
use crate::subscriber::SubscriberRegistry;

/// Buffered events per async receiver when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 1024;

type Shared = Arc<PermissionEvent>;

/// Delivers every published [`PermissionEvent`] to two kinds of listener.
///
/// * Async [`EventReceiver`]s read from a bounded broadcast channel. One
///   that falls more than `capacity` events behind loses the oldest.
/// * Callbacks in the [`SubscriberRegistry`] run inline inside
///   [`EventBus::publish`] and see everything.
///
/// Cloning yields a handle onto the same channel and registry.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Shared>,
    callbacks: Arc<SubscriberRegistry>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// A bus holding [`DEFAULT_CAPACITY`] events per receiver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus holding `capacity` events per receiver (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            tx: broadcast::Sender::new(capacity),
            callbacks: Arc::default(),
            capacity,
        }
    }

    /// Hand `event` to every receiver and callback.
    ///
    /// Returns how many async receivers were live at the time.
    pub fn publish(&self, event: PermissionEvent) -> usize {
        let event: Shared = Arc::new(event);
        let kind = event.event_type();

        let delivered = self.tx.send(Arc::clone(&event)).unwrap_or(0);
        if delivered == 0 {
            trace!(kind, "no async receivers");
        } else {
            debug!(kind, resource = %event.resource(), delivered, "event published");
        }

        self.callbacks.notify(&event);
        delivered
    }

    /// A receiver for every event.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
            resource: None,
        }
    }

    /// A receiver for events whose resource is `resource`.
    #[must_use]
    pub fn subscribe_resource(&self, resource: Address) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
            resource: Some(resource),
        }
    }

    /// Inline callbacks.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.callbacks
    }

    /// Async receivers plus registered callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.callbacks.len().saturating_add(self.tx.receiver_count())
    }

    /// Per-receiver buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Async end of an [`EventBus`], optionally narrowed to one resource.
pub struct EventReceiver {
    rx: broadcast::Receiver<Shared>,
    resource: Option<Address>,
}

impl EventReceiver {
    fn wanted(&self, event: &PermissionEvent) -> bool {
        self.resource.is_none_or(|r| r == event.resource())
    }

    fn lagged(skipped: u64) {
        warn!(skipped, "event receiver fell behind; oldest events dropped");
    }

    /// Wait for the next wanted event; `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<Shared> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.wanted(&event) => return Some(event),
                Ok(_) => {},
                Err(RecvError::Lagged(skipped)) => Self::lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The next wanted event already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Shared> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.wanted(&event) => return Some(event),
                Ok(_) => {},
                Err(TryRecvError::Lagged(skipped)) => Self::lagged(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Every wanted event already buffered.
    pub fn drain(&mut self) -> Vec<Shared> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
