//! Permission identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use warden_crypto::Digest;

use crate::error::{CoreError, CoreResult};

/// Name of the super-permission.
pub const ROOT_PERMISSION_NAME: &str = "ROOT_PERMISSION";

/// Derivation domain for [`PermissionId::named`].
const PERMISSION_ID_DOMAIN: &str = "warden.permission-id v1";

/// A fixed-width identifier naming a capability.
///
/// Ids are derived from names (`PermissionId::named("ADMIN")`) so that every
/// component agrees on the id without a registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionId([u8; 32]);

impl PermissionId {
    /// Derive the id for a permission name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        let hash = Digest::derive(PERMISSION_ID_DOMAIN, &[name.as_bytes()]);
        Self(*hash.as_bytes())
    }

    /// The super-permission (`ROOT`).
    #[must_use]
    pub fn root() -> Self {
        Self::named(ROOT_PERMISSION_NAME)
    }

    /// Whether this is the super-permission.
    #[must_use]
    pub fn is_root(&self) -> bool {
        *self == Self::root()
    }

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as `0x`-prefixed lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Parses `0x`-prefixed hex as a raw id and anything else as a name.
impl FromStr for PermissionId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let invalid = |reason: String| CoreError::InvalidPermissionId {
            input: s.to_owned(),
            reason,
        };
        if s.is_empty() {
            return Err(invalid("empty permission name".to_owned()));
        }
        let Some(digits) = s.strip_prefix("0x") else {
            return Ok(Self::named(s));
        };
        let hash = Digest::from_hex(digits).map_err(|e| invalid(e.to_string()))?;
        Ok(Self(*hash.as_bytes()))
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "PermissionId(ROOT)")
        } else {
            write!(f, "PermissionId({})", &self.to_hex()[..18])
        }
    }
}

impl Serialize for PermissionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PermissionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_is_deterministic() {
        assert_eq!(PermissionId::named("ADMIN"), PermissionId::named("ADMIN"));
        assert_ne!(PermissionId::named("ADMIN"), PermissionId::named("admin"));
    }

    #[test]
    fn test_root() {
        assert!(PermissionId::root().is_root());
        assert_eq!(PermissionId::root(), PermissionId::named(ROOT_PERMISSION_NAME));
        assert!(!PermissionId::named("ADMIN").is_root());
        assert_eq!(format!("{:?}", PermissionId::root()), "PermissionId(ROOT)");
    }

    #[test]
    fn test_parse_name_or_hex() {
        let by_name: PermissionId = "EXECUTE_PERMISSION".parse().unwrap();
        assert_eq!(by_name, PermissionId::named("EXECUTE_PERMISSION"));

        let by_hex: PermissionId = by_name.to_hex().parse().unwrap();
        assert_eq!(by_hex, by_name);
    }

    #[test]
    fn test_parse_rejects_empty_and_bad_hex() {
        assert!("".parse::<PermissionId>().is_err());
        assert!("0x1234".parse::<PermissionId>().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let id = PermissionId::named("UPGRADE");
        let json = serde_json::to_string(&id).unwrap();
        let back: PermissionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
