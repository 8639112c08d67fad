//! Warden Crypto - hashing primitives for the permission engine.
//!
//! This crate provides:
//! - BLAKE3 digests
//! - Domain-separated, multi-part key derivation used for permission ids
//!   and storage slot names
//!
//! # Example
//!
//! ```
//! use warden_crypto::Digest;
//!
//! let a = Digest::derive("warden.example", &[b"left", b"right"]);
//! let b = Digest::derive("warden.example", &[b"left", b"right"]);
//! assert_eq!(a, b);
//! assert_eq!(Digest::from_hex(&a.to_hex()).unwrap(), a);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod digest;

pub use error::{CryptoError, CryptoResult};
pub use digest::Digest;
