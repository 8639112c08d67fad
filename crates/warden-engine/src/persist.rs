//! Write-through persistence of the permission tables.
//!
//! Layout in the backing [`KvStore`]:
//!
//! | Namespace | Key | Value |
//! |-----------|-----|-------|
//! | `warden:grants` | hex of the derived permission key | [`GrantRecord`] JSON |
//! | `warden:freezes` | hex of the derived freeze key | [`FreezeRecord`] JSON |
//! | `warden:meta` | `initialized` | [`InitRecord`] JSON |
//!
//! Records carry the full tuple so the tables can be rebuilt on open; the
//! slot name is re-derived on load and must match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use warden_core::{Address, PermissionId, PermissionValue};
use warden_storage::{KvStore, KvWrite, ScopedKvStore};

use crate::error::{PermissionError, PermissionResult};
use crate::key::{FreezeKey, PermissionKey};
use crate::state::EngineState;

/// Namespace holding grant records.
pub const NS_GRANTS: &str = "warden:grants";
/// Namespace holding freeze records.
pub const NS_FREEZES: &str = "warden:freezes";
/// Namespace holding engine metadata.
pub const NS_META: &str = "warden:meta";

const INIT_KEY: &str = "initialized";

/// Stored form of one grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    /// Resource.
    pub resource: Address,
    /// Actor.
    pub actor: Address,
    /// Permission.
    pub permission_id: PermissionId,
    /// `Allow` or `Conditional`.
    pub value: PermissionValue,
}

/// Stored form of one freeze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeRecord {
    /// Resource.
    pub resource: Address,
    /// Permission.
    pub permission_id: PermissionId,
    /// When the freeze was committed.
    pub frozen_at: DateTime<Utc>,
}

/// Stored form of the initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRecord {
    /// Engine identity the tables belong to.
    pub engine: Address,
    /// Holder of the initial ROOT grant.
    pub root_holder: Address,
    /// When `initialize` was committed.
    pub initialized_at: DateTime<Utc>,
}

/// Run an async future synchronously.
///
/// Inside a runtime the future runs on a scoped thread to avoid the
/// "cannot `block_on` from within a runtime" panic; outside one a temporary
/// current-thread runtime is created.
fn block_on<F>(f: F) -> PermissionResult<F::Output>
where
    F: std::future::Future + Send,
    F::Output: Send,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => std::thread::scope(|s| s.spawn(|| handle.block_on(f)).join())
            .map_err(|_| PermissionError::Storage("storage task panicked".to_owned())),
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(|rt| rt.block_on(f))
            .map_err(|e| PermissionError::Storage(format!("failed to create tokio runtime: {e}"))),
    }
}

/// The engine's view of its backing store.
#[derive(Debug, Clone)]
pub(crate) struct Persistence {
    grants: ScopedKvStore,
    freezes: ScopedKvStore,
    meta: ScopedKvStore,
}

impl Persistence {
    pub(crate) fn new(store: Arc<dyn KvStore>) -> PermissionResult<Self> {
        Ok(Self {
            grants: ScopedKvStore::new(Arc::clone(&store), NS_GRANTS)?,
            freezes: ScopedKvStore::new(Arc::clone(&store), NS_FREEZES)?,
            meta: ScopedKvStore::new(store, NS_META)?,
        })
    }

    /// Rebuild the tables for `engine` from the store.
    pub(crate) fn load(&self, engine: Address) -> PermissionResult<EngineState> {
        let state = block_on(self.load_async(engine))??;
        info!(
            %engine,
            grants = state.store.len(),
            freezes = state.freezes.len(),
            initialized = state.initialized,
            "loaded permission tables"
        );
        Ok(state)
    }

    async fn load_async(&self, engine: Address) -> PermissionResult<EngineState> {
        let mut state = EngineState::default();

        for slot in self.grants.list_keys().await? {
            let Some(record) = self.grants.get_json::<GrantRecord>(&slot).await? else {
                continue;
            };
            let key = PermissionKey::new(record.resource, record.actor, record.permission_id);
            if key.storage_key() != slot {
                return Err(corrupt(NS_GRANTS, &slot));
            }
            state.store.set(key, record.value);
        }

        for slot in self.freezes.list_keys().await? {
            let Some(record) = self.freezes.get_json::<FreezeRecord>(&slot).await? else {
                continue;
            };
            let key = FreezeKey::new(record.resource, record.permission_id);
            if key.storage_key() != slot {
                return Err(corrupt(NS_FREEZES, &slot));
            }
            state.freezes.freeze(key);
        }

        if let Some(init) = self.meta.get_json::<InitRecord>(INIT_KEY).await? {
            if init.engine != engine {
                return Err(PermissionError::Storage(format!(
                    "store belongs to engine {}, not {engine}",
                    init.engine
                )));
            }
            debug!(root_holder = %init.root_holder, "store is initialized");
            state.initialized = true;
        }

        Ok(state)
    }

    /// Write that makes the stored grant match `value`.
    pub(crate) fn grant_write(
        &self,
        key: &PermissionKey,
        value: PermissionValue,
    ) -> PermissionResult<KvWrite> {
        let slot = key.storage_key();
        if !value.is_set() {
            return Ok(self.grants.delete_write(&slot));
        }
        let record = GrantRecord {
            resource: key.resource,
            actor: key.actor,
            permission_id: key.permission_id,
            value,
        };
        Ok(self.grants.json_write(&slot, &record)?)
    }

    pub(crate) fn freeze_write(&self, key: &FreezeKey) -> PermissionResult<KvWrite> {
        let record = FreezeRecord {
            resource: key.resource,
            permission_id: key.permission_id,
            frozen_at: Utc::now(),
        };
        Ok(self.freezes.json_write(&key.storage_key(), &record)?)
    }

    pub(crate) fn init_write(
        &self,
        engine: Address,
        root_holder: Address,
    ) -> PermissionResult<KvWrite> {
        let record = InitRecord {
            engine,
            root_holder,
            initialized_at: Utc::now(),
        };
        Ok(self.meta.json_write(INIT_KEY, &record)?)
    }

    /// Apply `writes` as one atomic batch.
    pub(crate) fn commit(&self, writes: Vec<KvWrite>) -> PermissionResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let count = writes.len();
        let store = Arc::clone(self.grants.store());
        block_on(async move { store.apply_batch(writes).await })??;
        debug!(writes = count, "committed permission writes");
        Ok(())
    }
}

fn corrupt(namespace: &str, slot: &str) -> PermissionError {
    PermissionError::Serialization(format!(
        "record in {namespace} at {slot} does not match its key"
    ))
}
