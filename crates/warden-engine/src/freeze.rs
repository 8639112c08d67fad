//! Permanent freezes.

use warden_core::{Address, PermissionId};

use crate::key::FreezeKey;

/// Set of frozen `(resource, permission)` pairs.
///
/// There is no removal: once inserted, a pair stays frozen for the life of
/// the engine and is restored on reload.
#[derive(Debug, Clone, Default)]
pub struct FreezeRegistry {
    frozen: im::HashSet<FreezeKey>,
}

impl FreezeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pair is frozen.
    #[must_use]
    pub fn is_frozen(&self, key: &FreezeKey) -> bool {
        self.frozen.contains(key)
    }

    /// Freeze the pair. Returns `false` if it was already frozen.
    pub fn freeze(&mut self, key: FreezeKey) -> bool {
        self.frozen.insert(key).is_none()
    }

    /// Permissions frozen on exactly this resource, sorted.
    #[must_use]
    pub fn frozen_on(&self, resource: Address) -> Vec<PermissionId> {
        let mut ids: Vec<PermissionId> = self
            .frozen
            .iter()
            .filter(|key| key.resource == resource)
            .map(|key| key.permission_id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of frozen pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frozen.len()
    }

    /// Whether nothing is frozen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frozen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_freeze_reports_existing() {
        let mut registry = FreezeRegistry::new();
        let key = FreezeKey::new(Address::derive("dao"), PermissionId::named("UPGRADE"));

        assert!(!registry.is_frozen(&key));
        assert!(registry.freeze(key));
        assert!(!registry.freeze(key));
        assert!(registry.is_frozen(&key));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_frozen_on() {
        let mut registry = FreezeRegistry::new();
        let dao = Address::derive("dao");
        registry.freeze(FreezeKey::new(dao, PermissionId::named("UPGRADE")));
        registry.freeze(FreezeKey::new(dao, PermissionId::named("MINT")));
        registry.freeze(FreezeKey::new(Address::derive("other"), PermissionId::named("MINT")));

        assert_eq!(registry.frozen_on(dao).len(), 2);
        assert!(registry.frozen_on(Address::derive("nobody")).is_empty());
    }
}
