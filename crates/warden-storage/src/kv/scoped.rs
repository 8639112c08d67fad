//! A store with its namespace fixed.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{KvStore, KvWrite, check_key, check_namespace};
use crate::error::{StorageError, StorageResult};

/// One namespace of a shared [`KvStore`], read and written as JSON.
///
/// Writes are not applied directly. [`json_write`](Self::json_write) and
/// [`delete_write`](Self::delete_write) return [`KvWrite`]s so writes for
/// several namespaces can be committed in one
/// [`apply_batch`](KvStore::apply_batch).
#[derive(Clone)]
pub struct ScopedKvStore {
    store: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ScopedKvStore").field(&self.namespace).finish()
    }
}

impl ScopedKvStore {
    /// Scope `store` to `namespace`.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidKey`] for an empty namespace or one containing
    /// a null byte.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        check_namespace(&namespace)?;
        Ok(Self { store, namespace })
    }

    /// The bound namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Every key in the namespace.
    ///
    /// # Errors
    ///
    /// Whatever the backend reports.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.store.list_keys(&self.namespace).await
    }

    /// Decode the JSON value under `key`, if present.
    ///
    /// # Errors
    ///
    /// [`StorageError::Codec`] if the stored bytes are not a `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        check_key(key)?;
        let Some(bytes) = self.store.get(&self.namespace, key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Codec(format!("{}/{key}: {e}", self.namespace)))
    }

    /// A write storing `value` as JSON under `key`.
    ///
    /// # Errors
    ///
    /// [`StorageError::Codec`] if `value` cannot be encoded.
    pub fn json_write<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<KvWrite> {
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Codec(e.to_string()))?;
        Ok(KvWrite::set(self.namespace.as_str(), key, bytes))
    }

    /// A write removing `key`.
    #[must_use]
    pub fn delete_write(&self, key: &str) -> KvWrite {
        KvWrite::delete(self.namespace.as_str(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    #[tokio::test]
    async fn test_two_scopes_one_batch() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let grants = ScopedKvStore::new(Arc::clone(&store), "warden:grants").unwrap();
        let freezes = ScopedKvStore::new(Arc::clone(&store), "warden:freezes").unwrap();

        store
            .apply_batch(vec![
                grants.json_write("g1", &vec![1u8, 2]).unwrap(),
                freezes.json_write("f1", &true).unwrap(),
            ])
            .await
            .unwrap();

        assert_eq!(grants.get_json::<Vec<u8>>("g1").await.unwrap(), Some(vec![1, 2]));
        assert_eq!(freezes.list_keys().await.unwrap(), vec!["f1"]);
        assert_eq!(grants.get_json::<bool>("f1").await.unwrap(), None);

        store.apply_batch(vec![grants.delete_write("g1")]).await.unwrap();
        assert!(grants.list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_codec_error() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let scoped = ScopedKvStore::new(Arc::clone(&store), "ns").unwrap();
        store.set("ns", "k", b"not json".to_vec()).await.unwrap();
        assert!(matches!(
            scoped.get_json::<u32>("k").await,
            Err(StorageError::Codec(_))
        ));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        assert!(ScopedKvStore::new(Arc::new(MemoryKvStore::new()), "").is_err());
    }
}
