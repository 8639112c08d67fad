//! Resource and actor addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use warden_crypto::Digest;

use crate::error::{CoreError, CoreResult};

/// Derivation domain for [`Address::derive`].
const ADDRESS_DOMAIN: &str = "warden.address v1";

const ADDRESS_LEN: usize = 20;

/// A 20-byte identity.
///
/// Resources, actors, condition handles and the engine itself are all
/// addressed the same way. The all-`0xff` value is reserved as the
/// wildcard [`Address::ANY`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Length of an address in bytes.
    pub const LEN: usize = ADDRESS_LEN;

    /// The zero address.
    pub const ZERO: Self = Self([0u8; Self::LEN]);

    /// Wildcard sentinel. Stored as the actor or resource of a grant it
    /// matches any concrete address during a check.
    pub const ANY: Self = Self([0xffu8; Self::LEN]);

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a stable address from a label.
    ///
    /// Never yields [`Address::ANY`] in practice; the probability is that of
    /// a 160-bit hash collision.
    #[must_use]
    pub fn derive(label: &str) -> Self {
        let hash = Digest::derive(ADDRESS_DOMAIN, &[label.as_bytes()]);
        let mut bytes = [0u8; Self::LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..Self::LEN]);
        Self(bytes)
    }

    /// Whether this is the wildcard sentinel.
    #[must_use]
    pub fn is_any(&self) -> bool {
        *self == Self::ANY
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Encode as `0x`-prefixed lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let invalid = |reason: String| CoreError::InvalidAddress {
            input: s.to_owned(),
            reason,
        };
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| invalid(e.to_string()))?;
        let bytes: [u8; Self::LEN] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| invalid(format!("expected 20 bytes, got {}", v.len())))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "Address(ANY)")
        } else {
            write!(f, "Address({})", &self.to_hex()[..10])
        }
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}
