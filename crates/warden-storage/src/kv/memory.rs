//! Process-local backend.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{KvStore, KvWrite, check_batch, check_key, check_namespace};
use crate::error::StorageResult;

type Table = BTreeMap<(String, String), Vec<u8>>;

/// A [`KvStore`] held in memory. Nothing survives the process.
///
/// A batch is applied under one write lock, so readers never observe half
/// of it.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    table: RwLock<Table>,
}

impl MemoryKvStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(BTreeMap::len)
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Poison is ignored: map operations never leave the table inconsistent.
    fn read<T>(&self, f: impl FnOnce(&Table) -> T) -> T {
        f(&self.table.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Table) -> T) -> T {
        f(&mut self.table.write().unwrap_or_else(PoisonError::into_inner))
    }

    fn slot(namespace: &str, key: &str) -> (String, String) {
        (namespace.to_owned(), key.to_owned())
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.read(|t| t.get(&Self::slot(namespace, key)).cloned()))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        check_namespace(namespace)?;
        check_key(key)?;
        self.write(|t| t.insert(Self::slot(namespace, key), value));
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        Ok(self.write(|t| t.remove(&Self::slot(namespace, key)).is_some()))
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        Ok(self.read(|t| {
            t.range(Self::slot(namespace, "")..)
                .take_while(|((ns, _), _)| ns == namespace)
                .map(|((_, key), _)| key.clone())
                .collect()
        }))
    }

    async fn apply_batch(&self, writes: Vec<KvWrite>) -> StorageResult<()> {
        check_batch(&writes)?;
        self.write(|t| {
            for write in writes {
                match write {
                    KvWrite::Set {
                        namespace,
                        key,
                        value,
                    } => {
                        t.insert((namespace, key), value);
                    },
                    KvWrite::Delete { namespace, key } => {
                        t.remove(&(namespace, key));
                    },
                }
            }
        });
        Ok(())
    }
}
