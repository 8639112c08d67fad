//! Namespaced byte store with atomic batches.
//!
//! [`KvStore`] is the contract every backend meets. [`KvWrite`] is one
//! staged change, and [`KvStore::apply_batch`] lands a list of them as a
//! single unit. [`ScopedKvStore`] fixes the namespace and speaks JSON.

mod memory;
mod scoped;
#[cfg(feature = "kv")]
mod surreal;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

pub use memory::MemoryKvStore;
pub use scoped::ScopedKvStore;
#[cfg(feature = "kv")]
pub use surreal::SurrealKvStore;

/// Namespaces and keys are non-empty and never contain `\0`, which the
/// persistent backend uses as the separator between the two.
fn check_part(what: &'static str, part: &str) -> StorageResult<()> {
    if part.is_empty() {
        return Err(StorageError::InvalidKey(format!("{what} is empty")));
    }
    if part.contains('\0') {
        return Err(StorageError::InvalidKey(format!("{what} contains a null byte")));
    }
    Ok(())
}

pub(crate) fn check_namespace(namespace: &str) -> StorageResult<()> {
    check_part("namespace", namespace)
}

pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    check_part("key", key)
}

/// A staged change for [`KvStore::apply_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    /// Store `value`, replacing whatever was there.
    Set {
        /// Namespace.
        namespace: String,
        /// Key within the namespace.
        key: String,
        /// Bytes to store.
        value: Vec<u8>,
    },
    /// Remove the key. A missing key is fine.
    Delete {
        /// Namespace.
        namespace: String,
        /// Key within the namespace.
        key: String,
    },
}

impl KvWrite {
    /// A [`KvWrite::Set`].
    pub fn set(namespace: impl Into<String>, key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Set {
            namespace: namespace.into(),
            key: key.into(),
            value,
        }
    }

    /// A [`KvWrite::Delete`].
    pub fn delete(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Delete {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Namespace the write targets.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Set { namespace, .. } | Self::Delete { namespace, .. } => namespace,
        }
    }

    /// Key the write targets.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Delete { key, .. } => key,
        }
    }

    pub(crate) fn check(&self) -> StorageResult<()> {
        check_namespace(self.namespace())?;
        check_key(self.key())
    }
}

/// Check every write of a batch before any is applied.
pub(crate) fn check_batch(writes: &[KvWrite]) -> StorageResult<()> {
    writes.iter().try_for_each(KvWrite::check)
}

/// A namespaced byte store.
///
/// Backends must make [`apply_batch`](Self::apply_batch) atomic: after it
/// returns, either every write is visible or none is.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Bytes under `key`, if any.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` under `key`.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Remove `key`; `true` if it was present.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Every key in `namespace`, in no particular order.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Apply `writes` in order as one unit. A malformed write anywhere in
    /// the list fails the batch before anything is written.
    async fn apply_batch(&self, writes: Vec<KvWrite>) -> StorageResult<()>;
}
