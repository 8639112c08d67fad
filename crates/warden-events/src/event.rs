//! Permission change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{Address, PermissionId, PermissionValue};

/// Metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the change was committed.
    pub timestamp: DateTime<Utc>,
    /// Component that produced the event.
    pub source: String,
    /// Correlates every event committed by the same call or bulk batch.
    pub batch_id: Option<Uuid>,
}

impl EventMetadata {
    /// Create metadata stamped now.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            batch_id: None,
        }
    }

    /// Attach a batch correlation id.
    #[must_use]
    pub fn with_batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }
}

/// A committed permission change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PermissionEvent {
    /// The engine was initialized and ROOT assigned to its first holder.
    Initialized {
        /// Event metadata.
        metadata: EventMetadata,
        /// The engine's own identity.
        engine: Address,
        /// Holder of the initial ROOT grant.
        root_holder: Address,
    },
    /// A permission was granted.
    Granted {
        /// Event metadata.
        metadata: EventMetadata,
        /// Actor whose ROOT authorized the change.
        caller: Address,
        /// Resource the grant applies to.
        resource: Address,
        /// Actor receiving the grant.
        actor: Address,
        /// Granted permission.
        permission_id: PermissionId,
        /// Stored value (`Allow` or `Conditional`).
        value: PermissionValue,
    },
    /// A permission was revoked.
    Revoked {
        /// Event metadata.
        metadata: EventMetadata,
        /// Actor whose ROOT authorized the change.
        caller: Address,
        /// Resource the grant applied to.
        resource: Address,
        /// Actor losing the grant.
        actor: Address,
        /// Revoked permission.
        permission_id: PermissionId,
    },
    /// A `(resource, permission)` pair was permanently frozen.
    Frozen {
        /// Event metadata.
        metadata: EventMetadata,
        /// Actor whose ROOT authorized the change.
        caller: Address,
        /// Frozen resource.
        resource: Address,
        /// Frozen permission.
        permission_id: PermissionId,
    },
}

impl PermissionEvent {
    /// Stable snake-case name of the event kind.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::Granted { .. } => "granted",
            Self::Revoked { .. } => "revoked",
            Self::Frozen { .. } => "frozen",
        }
    }

    /// Event metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::Initialized { metadata, .. }
            | Self::Granted { metadata, .. }
            | Self::Revoked { metadata, .. }
            | Self::Frozen { metadata, .. } => metadata,
        }
    }

    /// Resource affected by the change. For `Initialized` this is the
    /// engine itself.
    #[must_use]
    pub fn resource(&self) -> Address {
        match self {
            Self::Initialized { engine, .. } => *engine,
            Self::Granted { resource, .. }
            | Self::Revoked { resource, .. }
            | Self::Frozen { resource, .. } => *resource,
        }
    }

    /// Permission affected by the change (ROOT for `Initialized`).
    #[must_use]
    pub fn permission_id(&self) -> PermissionId {
        match self {
            Self::Initialized { .. } => PermissionId::root(),
            Self::Granted { permission_id, .. }
            | Self::Revoked { permission_id, .. }
            | Self::Frozen { permission_id, .. } => *permission_id,
        }
    }
}
