//! Stored permission values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;

/// Identity of an external policy object that decides a conditional grant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionHandle(pub Address);

impl ConditionHandle {
    /// Create a handle for the condition living at `address`.
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// The condition's address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for ConditionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "condition:{}", self.0)
    }
}

impl fmt::Debug for ConditionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConditionHandle({:?})", self.0)
    }
}

/// The value held for one `(resource, actor, permission)` key.
///
/// Absence from the store is semantically [`PermissionValue::Unset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "condition", rename_all = "snake_case")]
pub enum PermissionValue {
    /// No grant.
    #[default]
    Unset,
    /// Unconditionally granted.
    Allow,
    /// Granted if the referenced condition says so at check time.
    Conditional(ConditionHandle),
}

impl PermissionValue {
    /// Whether this value holds a grant (`Allow` or `Conditional`).
    #[must_use]
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// The condition handle, if this is a conditional grant.
    #[must_use]
    pub fn condition(&self) -> Option<ConditionHandle> {
        match self {
            Self::Conditional(handle) => Some(*handle),
            Self::Unset | Self::Allow => None,
        }
    }
}

impl fmt::Display for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Allow => write!(f, "allow"),
            Self::Conditional(handle) => write!(f, "conditional({})", handle.0),
        }
    }
}
