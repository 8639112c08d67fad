//! Warden Storage - the key-value layer under the permission tables.
//!
//! The permission engine keeps its live tables in memory and writes every
//! committed change through to a [`KvStore`]. Two properties matter:
//!
//! - **Namespacing.** Grants and freezes live in separate namespaces of the
//!   same store; [`ScopedKvStore`] pre-binds one.
//! - **Atomic batches.** [`KvStore::apply_batch`] applies a list of
//!   [`KvWrite`]s all-or-nothing, which is how a bulk permission batch
//!   reaches durable storage as one unit.
//!
//! # Backends
//!
//! | Backend | Feature | Use |
//! |---------|---------|-----|
//! | [`MemoryKvStore`] | always | tests, ephemeral engines |
//! | `SurrealKvStore` | `kv` | embedded, persistent, ACID |

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, KvWrite, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
