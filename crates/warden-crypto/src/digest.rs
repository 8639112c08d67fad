//! BLAKE3 digests.
//!
//! Anything that names a value inside the engine goes through
//! [`Digest::derive`], which keys BLAKE3 with a context string. Two names
//! built under different contexts never collide even when their input
//! bytes are identical.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// A 32-byte BLAKE3 output.
///
/// Serializes as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Digest([u8; Digest::LEN]);

impl Digest {
    /// Output width.
    pub const LEN: usize = 32;

    /// Plain BLAKE3 of `data`.
    #[must_use]
    pub fn of(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }

    /// BLAKE3 in key-derivation mode under `context`, over `parts` in order.
    ///
    /// Parts are concatenated without framing. Only feed fixed-width parts,
    /// or a layout whose widths are implied by the context.
    #[must_use]
    pub fn derive(context: &str, parts: &[&[u8]]) -> Self {
        let hasher = parts
            .iter()
            .fold(blake3::Hasher::new_derive_key(context), |mut h, part| {
                h.update(part);
                h
            });
        Self(hasher.finalize().into())
    }

    /// The digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse hex, with or without a leading `0x`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidHexEncoding`] for non-hex input and
    /// [`CryptoError::InvalidLength`] when it does not decode to 32 bytes.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| CryptoError::InvalidHexEncoding(e.to_string()))?;
        let actual = raw.len();
        <[u8; Self::LEN]>::try_from(raw)
            .map(Self)
            .map_err(|_| CryptoError::InvalidLength {
                expected: Self::LEN,
                actual,
            })
    }
}

impl From<[u8; Digest::LEN]> for Digest {
    fn from(bytes: [u8; Digest::LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Digest {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = CryptoError;

    fn try_from(s: String) -> CryptoResult<Self> {
        Self::from_hex(&s)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Digest({}..)", hex.get(..12).unwrap_or(&hex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_digest_is_deterministic() {
        assert_eq!(Digest::of(b"grant"), Digest::of(b"grant"));
        assert_ne!(Digest::of(b"grant"), Digest::of(b"revoke"));
    }

    #[test]
    fn test_context_separates_outputs() {
        assert_ne!(
            Digest::derive("warden.a", &[b"same"]),
            Digest::derive("warden.b", &[b"same"])
        );
        assert_ne!(Digest::derive("warden.a", &[b"same"]), Digest::of(b"same"));
    }

    #[test]
    fn test_part_order_is_significant() {
        assert_ne!(
            Digest::derive("warden.a", &[b"xx", b"yy"]),
            Digest::derive("warden.a", &[b"yy", b"xx"])
        );
        assert_eq!(
            Digest::derive("warden.a", &[b"xx", b"yy"]),
            Digest::derive("warden.a", &[b"xxyy"])
        );
    }

    #[test]
    fn test_hex_parsing() {
        let digest = Digest::of(b"slot");
        assert_eq!(digest.to_hex().len(), 64);
        assert_eq!(format!("0x{digest}").parse::<Digest>().unwrap(), digest);
        assert_eq!(
            Digest::from_hex("beef"),
            Err(CryptoError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
        assert!(matches!(
            Digest::from_hex("0xnothex"),
            Err(CryptoError::InvalidHexEncoding(_))
        ));
    }

    #[test]
    fn test_json_form_is_hex_string() {
        let digest = Digest::derive("warden.a", &[b"json"]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest.to_hex()));
        assert_eq!(serde_json::from_str::<Digest>(&json).unwrap(), digest);
        assert!(serde_json::from_str::<Digest>("\"00\"").is_err());
    }

    #[test]
    fn test_debug_is_abbreviated() {
        let digest = Digest::from([0xab; 32]);
        assert_eq!(format!("{digest:?}"), "Digest(abababababab..)");
    }
}
