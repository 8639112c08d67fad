//! Embedded persistent backend on `SurrealKV`.
//!
//! Entries are stored under `namespace ‖ 0x00 ‖ key`, so one namespace is
//! the half-open byte range `[namespace ‖ 0x00, namespace ‖ 0x01)`.

use std::path::Path;

use async_trait::async_trait;
use surrealkv::{Mode, Tree, TreeBuilder};
use tracing::debug;

use super::{KvStore, KvWrite, check_batch, check_key, check_namespace};
use crate::error::{StorageError, StorageResult};

const SEPARATOR: u8 = 0;

fn slot(namespace: &str, key: &str) -> Vec<u8> {
    [namespace.as_bytes(), &[SEPARATOR], key.as_bytes()].concat()
}

fn namespace_bounds(namespace: &str) -> (Vec<u8>, Vec<u8>) {
    let start = [namespace.as_bytes(), &[SEPARATOR]].concat();
    let end = [namespace.as_bytes(), &[SEPARATOR.wrapping_add(1)]].concat();
    (start, end)
}

#[allow(clippy::needless_pass_by_value)]
fn backend(e: surrealkv::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A [`KvStore`] persisted in a `SurrealKV` directory. Each call, and each
/// whole batch, is one transaction.
pub struct SurrealKvStore {
    tree: Tree,
}

impl std::fmt::Debug for SurrealKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealKvStore").finish_non_exhaustive()
    }
}

impl SurrealKvStore {
    /// Open (or create) the store in directory `path`.
    ///
    /// # Errors
    ///
    /// [`StorageError::Open`] if the directory cannot be used.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let tree = TreeBuilder::new()
            .with_path(path.to_path_buf())
            .build()
            .map_err(|e| StorageError::Open(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "opened permission store");
        Ok(Self { tree })
    }
}

#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_namespace(namespace)?;
        check_key(key)?;
        let tx = self.tree.begin_with_mode(Mode::ReadOnly).map_err(backend)?;
        tx.get(&slot(namespace, key)).map_err(backend)
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.apply_batch(vec![KvWrite::set(namespace, key, value)])
            .await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        check_namespace(namespace)?;
        check_key(key)?;
        let target = slot(namespace, key);
        let mut tx = self.tree.begin().map_err(backend)?;
        if tx.get(&target).map_err(backend)?.is_none() {
            return Ok(false);
        }
        tx.delete(&target).map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(true)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        check_namespace(namespace)?;
        let (start, end) = namespace_bounds(namespace);
        let tx = self.tree.begin_with_mode(Mode::ReadOnly).map_err(backend)?;
        let mut cursor = tx.range(&start, &end).map_err(backend)?;
        cursor.seek_first().map_err(backend)?;

        let mut keys = Vec::new();
        while cursor.valid() {
            let raw = cursor.key();
            match raw.get(start.len()..).map(std::str::from_utf8) {
                Some(Ok(key)) if !key.is_empty() => keys.push(key.to_owned()),
                _ => debug!(namespace, "skipping undecodable key"),
            }
            cursor.next().map_err(backend)?;
        }
        Ok(keys)
    }

    async fn apply_batch(&self, writes: Vec<KvWrite>) -> StorageResult<()> {
        check_batch(&writes)?;
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.tree.begin().map_err(backend)?;
        for write in &writes {
            let target = slot(write.namespace(), write.key());
            match write {
                KvWrite::Set { value, .. } => tx.set(&target, value).map_err(backend)?,
                KvWrite::Delete { .. } => {
                    if tx.get(&target).map_err(backend)?.is_some() {
                        tx.delete(&target).map_err(backend)?;
                    }
                },
            }
        }
        tx.commit().await.map_err(backend)
    }
}
