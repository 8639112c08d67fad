//! The grant table.

use serde::{Deserialize, Serialize};
use warden_core::{Address, PermissionId, PermissionValue};

use crate::key::PermissionKey;

/// Mapping from [`PermissionKey`] to [`PermissionValue`].
///
/// Backed by a persistent hash map, so cloning a store is O(1) and a clone
/// is an independent snapshot. Only set values are kept; a missing key
/// reads as [`PermissionValue::Unset`].
#[derive(Debug, Clone, Default)]
pub struct PermissionStore {
    grants: im::HashMap<PermissionKey, PermissionValue>,
}

impl PermissionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value held for `key`.
    #[must_use]
    pub fn get(&self, key: &PermissionKey) -> PermissionValue {
        self.grants.get(key).copied().unwrap_or_default()
    }

    /// Store `value` under `key`. Setting [`PermissionValue::Unset`] removes
    /// the entry.
    pub fn set(&mut self, key: PermissionKey, value: PermissionValue) {
        if value.is_set() {
            self.grants.insert(key, value);
        } else {
            self.grants.remove(&key);
        }
    }

    /// Grants stored with exactly this resource, sorted by actor then
    /// permission.
    #[must_use]
    pub fn grants_on(&self, resource: Address) -> Vec<GrantEntry> {
        let mut entries: Vec<GrantEntry> = self
            .grants
            .iter()
            .filter(|(key, _)| key.resource == resource)
            .map(|(key, value)| GrantEntry {
                actor: key.actor,
                permission_id: key.permission_id,
                value: *value,
            })
            .collect();
        entries.sort_by_key(|e| (e.actor, e.permission_id));
        entries
    }

    /// Number of set grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether no grant is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// One grant on a resource, as listed by [`PermissionStore::grants_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantEntry {
    /// Holder of the grant (may be the wildcard).
    pub actor: Address,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// `Allow` or `Conditional`.
    pub value: PermissionValue,
}
