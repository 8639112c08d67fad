//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_events::prelude::*;` to import all essential types.

pub use crate::{
    EventBus, EventMetadata, EventReceiver, EventSubscriber, PermissionEvent, SubscriberId,
    SubscriberRegistry,
};
