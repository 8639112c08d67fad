//! Warden Events - notifications for committed permission changes.
//!
//! This crate provides:
//! - [`PermissionEvent`]: one notification per successful mutation
//!   (`Initialized`, `Granted`, `Revoked`, `Frozen`)
//! - A broadcast [`EventBus`] for async receivers
//! - A [`SubscriberRegistry`] for synchronous callbacks
//!
//! The engine publishes only after a mutation (or a whole bulk batch) has
//! been committed, so a receiver never observes an event for state that was
//! rolled back.
//!
//! # Example
//!
//! ```rust
//! use warden_core::{Address, PermissionId};
//! use warden_events::{EventBus, EventMetadata, PermissionEvent};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(PermissionEvent::Frozen {
//!     metadata: EventMetadata::new("engine"),
//!     caller: Address::derive("admin"),
//!     resource: Address::derive("dao"),
//!     permission_id: PermissionId::named("UPGRADE"),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "frozen");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;
mod subscriber;

pub use bus::{DEFAULT_CAPACITY, EventBus, EventReceiver};
pub use event::{EventMetadata, PermissionEvent};
pub use subscriber::{EventSubscriber, SubscriberId, SubscriberRegistry};
