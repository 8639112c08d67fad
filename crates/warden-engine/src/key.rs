//! Lookup keys for grants and freezes.
//!
//! The in-memory tables are keyed by the structured [`PermissionKey`] and
//! [`FreezeKey`]. The derived hashes name the slot a record occupies in the
//! backing key-value store; their preimage layout is fixed:
//!
//! ```text
//! permission: "PERMISSION" ‖ actor ‖ resource ‖ permission_id
//! freeze:     "IMMUTABLE"  ‖ resource ‖ permission_id
//! ```

use serde::{Deserialize, Serialize};
use warden_core::{Address, PermissionId};
use warden_crypto::Digest;

/// BLAKE3 derivation context for storage keys.
pub const KEY_DOMAIN: &str = "warden.permission";

const PERMISSION_TAG: &[u8] = b"PERMISSION";
const FREEZE_TAG: &[u8] = b"IMMUTABLE";

/// Identity of one grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    /// Where the permission applies.
    pub resource: Address,
    /// Who holds it.
    pub actor: Address,
    /// What it allows.
    pub permission_id: PermissionId,
}

impl PermissionKey {
    /// Build a key.
    #[must_use]
    pub const fn new(resource: Address, actor: Address, permission_id: PermissionId) -> Self {
        Self {
            resource,
            actor,
            permission_id,
        }
    }

    /// Same key with the actor replaced by the wildcard.
    #[must_use]
    pub const fn with_any_actor(self) -> Self {
        Self {
            actor: Address::ANY,
            ..self
        }
    }

    /// Same key with the resource replaced by the wildcard.
    #[must_use]
    pub const fn with_any_resource(self) -> Self {
        Self {
            resource: Address::ANY,
            ..self
        }
    }

    /// The freeze key covering this grant.
    #[must_use]
    pub const fn freeze_key(&self) -> FreezeKey {
        FreezeKey::new(self.resource, self.permission_id)
    }

    /// Derived hash of this key.
    #[must_use]
    pub fn derive(&self) -> Digest {
        derive_permission_key(self.resource, self.actor, self.permission_id)
    }

    /// Storage slot name (hex of the derived hash).
    #[must_use]
    pub fn storage_key(&self) -> String {
        self.derive().to_hex()
    }
}

/// Identity of one freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FreezeKey {
    /// Frozen resource.
    pub resource: Address,
    /// Frozen permission.
    pub permission_id: PermissionId,
}

impl FreezeKey {
    /// Build a key.
    #[must_use]
    pub const fn new(resource: Address, permission_id: PermissionId) -> Self {
        Self {
            resource,
            permission_id,
        }
    }

    /// Derived hash of this key.
    #[must_use]
    pub fn derive(&self) -> Digest {
        derive_freeze_key(self.resource, self.permission_id)
    }

    /// Storage slot name (hex of the derived hash).
    #[must_use]
    pub fn storage_key(&self) -> String {
        self.derive().to_hex()
    }
}

/// Derive the storage key of a grant.
#[must_use]
pub fn derive_permission_key(
    resource: Address,
    actor: Address,
    permission_id: PermissionId,
) -> Digest {
    Digest::derive(
        KEY_DOMAIN,
        &[
            PERMISSION_TAG,
            actor.as_bytes(),
            resource.as_bytes(),
            permission_id.as_bytes(),
        ],
    )
}

/// Derive the storage key of a freeze.
#[must_use]
pub fn derive_freeze_key(resource: Address, permission_id: PermissionId) -> Digest {
    Digest::derive(
        KEY_DOMAIN,
        &[FREEZE_TAG, resource.as_bytes(), permission_id.as_bytes()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_stable() {
        let r = Address::derive("dao");
        let a = Address::derive("alice");
        let p = PermissionId::named("ADMIN");

        assert_eq!(derive_permission_key(r, a, p), derive_permission_key(r, a, p));
        assert_eq!(derive_freeze_key(r, p), derive_freeze_key(r, p));
        assert_eq!(PermissionKey::new(r, a, p).derive(), derive_permission_key(r, a, p));
    }

    #[test]
    fn test_swapped_actor_and_resource_differ() {
        let x = Address::derive("x");
        let y = Address::derive("y");
        let p = PermissionId::named("ADMIN");

        assert_ne!(derive_permission_key(x, y, p), derive_permission_key(y, x, p));
    }

    #[test]
    fn test_grant_and_freeze_keys_are_disjoint() {
        let r = Address::derive("dao");
        let p = PermissionId::named("ADMIN");

        assert_ne!(
            derive_permission_key(r, Address::ANY, p),
            derive_freeze_key(r, p)
        );
        assert_ne!(derive_freeze_key(r, p), derive_freeze_key(r, PermissionId::root()));
    }

    #[test]
    fn test_wildcard_variants() {
        let key = PermissionKey::new(
            Address::derive("dao"),
            Address::derive("alice"),
            PermissionId::named("ADMIN"),
        );

        assert!(key.with_any_actor().actor.is_any());
        assert_eq!(key.with_any_actor().resource, key.resource);
        assert!(key.with_any_resource().resource.is_any());
        assert_eq!(key.freeze_key(), FreezeKey::new(key.resource, key.permission_id));
    }

    #[test]
    fn test_storage_key_is_hex() {
        let key = FreezeKey::new(Address::derive("dao"), PermissionId::named("ADMIN"));
        let slot = key.storage_key();
        assert_eq!(slot.len(), 64);
        assert!(slot.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
