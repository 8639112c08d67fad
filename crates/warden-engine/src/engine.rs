//! The permission engine facade.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use tracing::{debug, info, warn};
use warden_config::{Config, StorageBackend};
use warden_core::{Address, ConditionHandle, PermissionId, PermissionValue};
use warden_events::{EventBus, EventReceiver, PermissionEvent};
use warden_storage::KvStore;

use crate::bulk::{BulkExecutor, MultiTargetOperation, PermissionOperation};
use crate::check::check;
use crate::condition::{ConditionEvaluator, ConditionRegistry, PermissionCondition};
use crate::error::{PermissionError, PermissionResult};
use crate::guard::AuthorizationGuard;
use crate::key::{FreezeKey, PermissionKey};
use crate::persist::Persistence;
use crate::state::EngineState;
use crate::store::GrantEntry;
use crate::transaction::Transaction;

/// Identity used when none is configured (`0x00…01`).
pub const DEFAULT_ENGINE_IDENTITY: Address = Address::from_bytes([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

/// A capability-based authorization kernel.
///
/// Mutations are serialized: each administrative call (or whole bulk
/// batch) runs against a private copy of the tables, is flushed to the
/// backing store as one batch, and then replaces the published snapshot.
/// Readers clone the current snapshot and never wait on a writer.
///
/// A condition that calls back into a mutating method while a mutation is
/// running on the same thread gets [`PermissionError::Reentrant`].
///
/// Events are delivered after the writer lock is released, in commit
/// order. An inline subscriber may therefore call a mutating method; the
/// events of that nested change are delivered once the current ones are.
/// When another thread is already delivering, a commit returns before its
/// events are handed out and that thread delivers them.
pub struct PermissionEngine {
    guard: AuthorizationGuard,
    evaluator: ConditionEvaluator,
    persistence: Option<Persistence>,
    events: Option<EventBus>,
    state: RwLock<Arc<EngineState>>,
    writer: Mutex<()>,
    active_writer: Mutex<Option<ThreadId>>,
    outbox: Mutex<Outbox>,
}

/// Committed events waiting to be delivered.
#[derive(Default)]
struct Outbox {
    pending: VecDeque<PermissionEvent>,
    draining: bool,
}

/// Releases the draining flag if a subscriber panics mid-delivery.
struct DrainGuard<'a>(&'a Mutex<Outbox>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).draining = false;
        }
    }
}

impl std::fmt::Debug for PermissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("PermissionEngine")
            .field("identity", &self.identity())
            .field("initialized", &state.initialized)
            .field("grants", &state.store.len())
            .field("freezes", &state.freezes.len())
            .field("persistent", &self.persistence.is_some())
            .finish_non_exhaustive()
    }
}

/// Clears the active-writer marker when a mutation ends.
struct WriterGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    active: &'a Mutex<Option<ThreadId>>,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl PermissionEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// In-memory engine at `identity` with an event bus and no persistence.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::WildcardDisallowed`] if `identity` is the
    /// wildcard.
    pub fn new(identity: Address) -> PermissionResult<Self> {
        Self::builder().with_identity(identity).build()
    }

    /// Build an engine from configuration.
    ///
    /// # Errors
    ///
    /// See [`EngineBuilder::with_config`] and [`EngineBuilder::build`].
    pub fn from_config(config: &Config) -> PermissionResult<Self> {
        Self::builder().with_config(config)?.build()
    }

    /// The engine's own identity. ROOT on it authorizes engine-wide
    /// administration.
    #[must_use]
    pub fn identity(&self) -> Address {
        self.guard.engine()
    }

    /// Whether [`Self::initialize`] has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.snapshot().initialized
    }

    /// The event bus, if events are enabled.
    #[must_use]
    pub fn event_bus(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    /// Subscribe to committed changes, if events are enabled.
    #[must_use]
    pub fn subscribe(&self) -> Option<EventReceiver> {
        self.events.as_ref().map(EventBus::subscribe)
    }

    /// The condition registry.
    #[must_use]
    pub fn conditions(&self) -> &Arc<ConditionRegistry> {
        self.evaluator.registry()
    }

    /// Register a policy object under `handle`, returning the one it
    /// replaced. Existing conditional grants pick it up on their next check.
    pub fn register_condition(
        &self,
        handle: ConditionHandle,
        condition: Arc<dyn PermissionCondition>,
    ) -> Option<Arc<dyn PermissionCondition>> {
        debug!(%handle, condition = condition.name(), "registering condition");
        self.conditions().register(handle, condition)
    }

    /// Remove the policy object under `handle`. Grants referring to it deny
    /// until a condition is registered again.
    pub fn unregister_condition(
        &self,
        handle: ConditionHandle,
    ) -> Option<Arc<dyn PermissionCondition>> {
        self.conditions().unregister(handle)
    }

    // -- Administrative surface --

    /// Assign ROOT on the engine to `root_holder`. Callable once.
    ///
    /// # Errors
    ///
    /// - [`PermissionError::AlreadyInitialized`] on a second call
    /// - [`PermissionError::WildcardDisallowed`] if `root_holder` is the wildcard
    pub fn initialize(&self, root_holder: Address) -> PermissionResult<()> {
        self.mutate("initialize", |tx| tx.initialize(root_holder))
    }

    /// Grant `permission_id` on `resource` to `actor`.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `Frozen`, wildcard errors or `AlreadyGranted`, in
    /// that order of precedence. A frozen pair always reports `Frozen`.
    pub fn grant(
        &self,
        caller: Address,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
    ) -> PermissionResult<()> {
        self.mutate("grant", |tx| {
            tx.grant(caller, resource, actor, permission_id, None)
        })
    }

    /// Grant `permission_id` on `resource` to `actor`, decided at check time
    /// by the condition registered under `condition`.
    ///
    /// # Errors
    ///
    /// As [`Self::grant`], plus [`PermissionError::ConditionNotRegistered`],
    /// which ranks after `Frozen` and the wildcard errors.
    pub fn grant_with_condition(
        &self,
        caller: Address,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
        condition: ConditionHandle,
    ) -> PermissionResult<()> {
        self.mutate("grant_with_condition", |tx| {
            tx.grant(caller, resource, actor, permission_id, Some(condition))
        })
    }

    /// Revoke `permission_id` on `resource` from `actor`.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `Frozen` or `AlreadyRevoked`.
    pub fn revoke(
        &self,
        caller: Address,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
    ) -> PermissionResult<()> {
        self.mutate("revoke", |tx| tx.revoke(caller, resource, actor, permission_id))
    }

    /// Permanently freeze `(resource, permission_id)`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` or `AlreadyFrozen`.
    pub fn freeze(
        &self,
        caller: Address,
        resource: Address,
        permission_id: PermissionId,
    ) -> PermissionResult<()> {
        self.mutate("freeze", |tx| tx.freeze(caller, resource, permission_id))
    }

    /// Apply `operations` on `resource` in order, all or nothing.
    ///
    /// # Errors
    ///
    /// [`PermissionError::BatchAborted`] wrapping the first failure.
    pub fn bulk(
        &self,
        caller: Address,
        resource: Address,
        operations: &[PermissionOperation],
    ) -> PermissionResult<()> {
        self.mutate("bulk", |tx| {
            BulkExecutor::new(tx, caller).run(operations.iter().map(|op| (resource, op)))
        })
    }

    /// Apply `operations`, each on its own resource, in order, all or
    /// nothing.
    ///
    /// # Errors
    ///
    /// [`PermissionError::BatchAborted`] wrapping the first failure.
    pub fn bulk_multi_target(
        &self,
        caller: Address,
        operations: &[MultiTargetOperation],
    ) -> PermissionResult<()> {
        self.mutate("bulk_multi_target", |tx| {
            BulkExecutor::new(tx, caller)
                .run(operations.iter().map(|op| (op.resource, &op.operation)))
        })
    }

    // -- Query surface --

    /// Whether `actor` may use `permission_id` on `resource`.
    ///
    /// Resolution order: exact grant, then any-actor grant on the resource,
    /// then any-resource grant for the actor. The first set value decides;
    /// a conditional value asks its condition with `data`.
    #[must_use]
    pub fn check(
        &self,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
        data: &[u8],
    ) -> bool {
        let state = self.snapshot();
        check(&state, &self.evaluator, resource, actor, permission_id, data)
    }

    /// Whether `caller` may administer permissions on `resource`.
    #[must_use]
    pub fn is_authorized(&self, caller: Address, resource: Address) -> bool {
        let state = self.snapshot();
        self.guard
            .is_authorized(&state, &self.evaluator, caller, resource)
    }

    /// Whether `(resource, permission_id)` is frozen.
    #[must_use]
    pub fn is_frozen(&self, resource: Address, permission_id: PermissionId) -> bool {
        self.snapshot()
            .freezes
            .is_frozen(&FreezeKey::new(resource, permission_id))
    }

    /// The value stored under the exact key, without wildcard fallback.
    #[must_use]
    pub fn get_permission_value(
        &self,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
    ) -> PermissionValue {
        self.snapshot()
            .store
            .get(&PermissionKey::new(resource, actor, permission_id))
    }

    /// Grants stored with exactly this resource.
    #[must_use]
    pub fn grants_on(&self, resource: Address) -> Vec<GrantEntry> {
        self.snapshot().store.grants_on(resource)
    }

    /// Permissions frozen on this resource.
    #[must_use]
    pub fn frozen_on(&self, resource: Address) -> Vec<PermissionId> {
        self.snapshot().freezes.frozen_on(resource)
    }

    // -- Internals --

    fn snapshot(&self) -> Arc<EngineState> {
        // The lock only guards an `Arc` swap, which cannot be left half done.
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn enter_writer(&self) -> PermissionResult<WriterGuard<'_>> {
        let me = thread::current().id();
        if *self
            .active_writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == Some(me)
        {
            return Err(PermissionError::Reentrant);
        }

        let lock = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        *self
            .active_writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(me);
        Ok(WriterGuard {
            _lock: lock,
            active: &self.active_writer,
        })
    }

    /// Run one unit of change: stage, flush, publish.
    fn mutate<F>(&self, operation: &'static str, f: F) -> PermissionResult<()>
    where
        F: FnOnce(&mut Transaction<'_>) -> PermissionResult<()>,
    {
        let writer = self.enter_writer().inspect_err(|_| {
            warn!(operation, "reentrant mutation rejected");
        })?;

        let base = EngineState::clone(&self.snapshot());
        let mut tx = Transaction::new(
            &self.guard,
            &self.evaluator,
            self.persistence.as_ref(),
            base,
        );
        if let Err(e) = f(&mut tx) {
            warn!(operation, error = %e, "permission change rejected");
            return Err(e);
        }

        let staged = tx.finish();
        if staged.events.is_empty() {
            debug!(operation, "nothing to commit");
            return Ok(());
        }

        if let Some(persistence) = &self.persistence {
            persistence.commit(staged.writes).inspect_err(|e| {
                warn!(operation, error = %e, "failed to persist permission change");
            })?;
        }
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(staged.state);

        // Queue under the writer lock so delivery follows commit order.
        self.lock_outbox().pending.extend(staged.events);
        drop(writer);
        self.deliver_pending();
        Ok(())
    }

    fn lock_outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver queued events unless another call is already doing so.
    fn deliver_pending(&self) {
        {
            let mut outbox = self.lock_outbox();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        let _guard = DrainGuard(&self.outbox);

        loop {
            let next = {
                let mut outbox = self.lock_outbox();
                let next = outbox.pending.pop_front();
                if next.is_none() {
                    outbox.draining = false;
                }
                next
            };
            let Some(event) = next else { break };

            info!(
                event = event.event_type(),
                resource = %event.resource(),
                permission_id = %event.permission_id(),
                "permission change committed"
            );
            if let Some(bus) = &self.events {
                bus.publish(event);
            }
        }
    }
}

/// Builder for [`PermissionEngine`].
pub struct EngineBuilder {
    identity: Address,
    initial_root_holder: Option<Address>,
    restricted: Vec<PermissionId>,
    kv_store: Option<Arc<dyn KvStore>>,
    events_enabled: bool,
    event_bus: Option<EventBus>,
    conditions: Vec<(ConditionHandle, Arc<dyn PermissionCondition>)>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            identity: DEFAULT_ENGINE_IDENTITY,
            initial_root_holder: None,
            restricted: Vec::new(),
            kv_store: None,
            events_enabled: true,
            event_bus: None,
            conditions: Vec::new(),
        }
    }
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("identity", &self.identity)
            .field("initial_root_holder", &self.initial_root_holder)
            .field("restricted", &self.restricted)
            .field("persistent", &self.kv_store.is_some())
            .field("events_enabled", &self.events_enabled)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

impl EngineBuilder {
    /// Set the engine identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Address) -> Self {
        self.identity = identity;
        self
    }

    /// Initialize with a ROOT grant for `holder` on build, unless the
    /// backing store is already initialized.
    #[must_use]
    pub fn with_initial_root_holder(mut self, holder: Address) -> Self {
        self.initial_root_holder = Some(holder);
        self
    }

    /// Forbid granting `permission_id` to a wildcard actor or resource.
    #[must_use]
    pub fn with_restricted_wildcard_permission(mut self, permission_id: PermissionId) -> Self {
        self.restricted.push(permission_id);
        self
    }

    /// Persist the tables in `store` and load existing ones from it.
    #[must_use]
    pub fn with_kv_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.kv_store = Some(store);
        self
    }

    /// Publish on `bus` instead of a fresh one.
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events_enabled = true;
        self.event_bus = Some(bus);
        self
    }

    /// Do not publish events.
    #[must_use]
    pub fn without_events(mut self) -> Self {
        self.events_enabled = false;
        self.event_bus = None;
        self
    }

    /// Register a condition before the engine starts.
    #[must_use]
    pub fn with_condition(
        mut self,
        handle: ConditionHandle,
        condition: Arc<dyn PermissionCondition>,
    ) -> Self {
        self.conditions.push((handle, condition));
        self
    }

    /// Apply the `[engine]`, `[storage]` and `[events]` sections.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::InvalidConfig`] for unparsable addresses or
    /// permission names, or a backend this build does not include, and
    /// [`PermissionError::Storage`] if the persistent store cannot be opened.
    pub fn with_config(mut self, config: &Config) -> PermissionResult<Self> {
        let engine = &config.engine;
        self.identity = parse_config(&engine.identity, "engine.identity")?;
        if let Some(holder) = &engine.initial_root_holder {
            self.initial_root_holder = Some(parse_config(holder, "engine.initial_root_holder")?);
        }
        for name in &engine.restricted_wildcard_permissions {
            self.restricted.push(parse_config(
                name,
                "engine.restricted_wildcard_permissions",
            )?);
        }

        match config.storage.backend {
            StorageBackend::Memory => {},
            StorageBackend::SurrealKv => {
                self.kv_store = Some(open_surrealkv(config.storage.path.as_deref())?);
            },
        }

        self.events_enabled = config.events.enabled;
        self.event_bus = config
            .events
            .enabled
            .then(|| EventBus::with_capacity(config.events.channel_capacity));
        Ok(self)
    }

    /// Build the engine, loading persisted tables and initializing if
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is the wildcard, the persisted
    /// tables cannot be loaded, or initialization fails.
    pub fn build(self) -> PermissionResult<PermissionEngine> {
        if self.identity.is_any() {
            return Err(PermissionError::WildcardDisallowed(
                "the engine identity must be a concrete address",
            ));
        }

        let guard = self
            .restricted
            .iter()
            .fold(AuthorizationGuard::new(self.identity), |g, id| {
                g.with_restricted(*id)
            });

        let registry = Arc::new(ConditionRegistry::new());
        for (handle, condition) in self.conditions {
            registry.register(handle, condition);
        }

        let persistence = self.kv_store.map(Persistence::new).transpose()?;
        let state = match &persistence {
            Some(p) => p.load(self.identity)?,
            None => EngineState::default(),
        };

        let events = if self.events_enabled {
            Some(self.event_bus.unwrap_or_default())
        } else {
            None
        };

        let engine = PermissionEngine {
            guard,
            evaluator: ConditionEvaluator::new(registry),
            persistence,
            events,
            state: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
            active_writer: Mutex::new(None),
            outbox: Mutex::default(),
        };

        if let Some(holder) = self.initial_root_holder {
            if engine.is_initialized() {
                debug!(%holder, "engine already initialized, ignoring initial root holder");
            } else {
                engine.initialize(holder)?;
            }
        }

        info!(
            identity = %engine.identity(),
            persistent = engine.persistence.is_some(),
            initialized = engine.is_initialized(),
            "permission engine ready"
        );
        Ok(engine)
    }
}

fn parse_config<T>(value: &str, field: &str) -> PermissionResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| PermissionError::InvalidConfig(format!("{field}: {e}")))
}

#[cfg(feature = "kv")]
fn open_surrealkv(path: Option<&std::path::Path>) -> PermissionResult<Arc<dyn KvStore>> {
    let path = path.ok_or_else(|| {
        PermissionError::InvalidConfig("storage.path is required for surrealkv".to_owned())
    })?;
    let store = warden_storage::SurrealKvStore::open(path)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "kv"))]
fn open_surrealkv(_path: Option<&std::path::Path>) -> PermissionResult<Arc<dyn KvStore>> {
    Err(PermissionError::InvalidConfig(
        "storage.backend = \"surrealkv\" requires the `kv` feature".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::FnCondition;
    use warden_storage::MemoryKvStore;

    fn addr(label: &str) -> Address {
        Address::derive(label)
    }

    fn admin() -> PermissionId {
        PermissionId::named("ADMIN")
    }

    fn engine_with_root(holder: Address) -> PermissionEngine {
        PermissionEngine::builder()
            .with_initial_root_holder(holder)
            .build()
            .unwrap()
    }

    #[test]
    fn test_initialize_once() {
        let engine = PermissionEngine::new(addr("engine")).unwrap();
        assert!(!engine.is_initialized());

        engine.initialize(addr("h")).unwrap();
        assert!(engine.is_initialized());
        assert!(engine.check(engine.identity(), addr("h"), PermissionId::root(), &[]));
        assert!(matches!(
            engine.initialize(addr("other")),
            Err(PermissionError::AlreadyInitialized { .. })
        ));
    }

    #[test]
    fn test_uninitialized_engine_authorizes_nobody() {
        let engine = PermissionEngine::new(addr("engine")).unwrap();
        assert!(matches!(
            engine.grant(addr("h"), addr("r"), addr("x"), admin()),
            Err(PermissionError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_wildcard_identity_rejected() {
        assert!(matches!(
            PermissionEngine::new(Address::ANY),
            Err(PermissionError::WildcardDisallowed(_))
        ));
    }

    #[test]
    fn test_grant_revoke_round_trip() {
        let h = addr("h");
        let engine = engine_with_root(h);
        let (r, x) = (addr("r"), addr("x"));

        engine.grant(h, r, x, admin()).unwrap();
        assert!(matches!(
            engine.grant(h, r, x, admin()),
            Err(PermissionError::AlreadyGranted { .. })
        ));
        engine.revoke(h, r, x, admin()).unwrap();
        assert!(!engine.check(r, x, admin(), &[]));
        assert!(matches!(
            engine.revoke(h, r, x, admin()),
            Err(PermissionError::AlreadyRevoked { .. })
        ));
        engine.grant(h, r, x, admin()).unwrap();
        assert!(engine.check(r, x, admin(), &[]));
        assert_eq!(engine.get_permission_value(r, x, admin()), PermissionValue::Allow);
    }

    #[test]
    fn test_freeze_blocks_mutation_even_for_root() {
        let h = addr("h");
        let engine = engine_with_root(h);
        let r = addr("r");

        engine.grant(h, r, addr("x"), admin()).unwrap();
        engine.freeze(h, r, admin()).unwrap();
        assert!(engine.is_frozen(r, admin()));
        assert!(matches!(
            engine.freeze(h, r, admin()),
            Err(PermissionError::AlreadyFrozen { .. })
        ));
        assert!(matches!(
            engine.grant(h, r, addr("z"), admin()),
            Err(PermissionError::Frozen { .. })
        ));
        assert!(matches!(
            engine.revoke(h, r, addr("x"), admin()),
            Err(PermissionError::Frozen { .. })
        ));
        assert_eq!(engine.frozen_on(r), vec![admin()]);
    }

    #[test]
    fn test_resource_root_holder_administers_only_that_resource() {
        let h = addr("h");
        let engine = engine_with_root(h);
        let (r, other, y) = (addr("r"), addr("other"), addr("y"));

        engine.grant(h, r, y, PermissionId::root()).unwrap();
        engine.grant(y, r, addr("z"), admin()).unwrap();
        assert!(matches!(
            engine.grant(y, other, addr("z"), admin()),
            Err(PermissionError::Unauthorized { .. })
        ));
        assert!(engine.is_authorized(y, r));
        assert!(!engine.is_authorized(y, other));
    }

    #[test]
    fn test_bulk_rolls_back_on_failure() {
        let h = addr("h");
        let engine = engine_with_root(h);
        let r = addr("r");
        let upgrade = PermissionId::named("UPGRADE");
        engine.freeze(h, r, upgrade).unwrap();
        let mut rx = engine.subscribe().unwrap();

        let err = engine
            .bulk(
                h,
                r,
                &[
                    PermissionOperation::grant(addr("a"), admin()),
                    PermissionOperation::grant(addr("b"), admin()),
                    PermissionOperation::freeze(upgrade),
                ],
            )
            .unwrap_err();

        assert!(matches!(err, PermissionError::BatchAborted { index: 2, .. }));
        assert!(matches!(
            err.root_cause(),
            PermissionError::AlreadyFrozen { .. }
        ));
        assert!(!engine.check(r, addr("a"), admin(), &[]));
        assert!(!engine.check(r, addr("b"), admin(), &[]));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_empty_bulk_is_a_no_op() {
        let h = addr("h");
        let engine = engine_with_root(h);
        let mut rx = engine.subscribe().unwrap();
        engine.bulk(h, addr("r"), &[]).unwrap();
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_bulk_item_without_actor_is_invalid() {
        let h = addr("h");
        let engine = engine_with_root(h);
        let op = PermissionOperation {
            actor: None,
            ..PermissionOperation::grant(addr("x"), admin())
        };
        let err = engine.bulk(h, addr("r"), &[op]).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            PermissionError::InvalidOperation(_)
        ));
    }

    #[test]
    fn test_reentrant_mutation_rejected() {
        let h = addr("h");
        let engine = Arc::new(engine_with_root(h));
        let handle = ConditionHandle::new(addr("reentrant"));
        let seen = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&engine);
        let slot = Arc::clone(&seen);
        engine.register_condition(
            handle,
            Arc::new(FnCondition::new(move |req| {
                if let Some(engine) = weak.upgrade() {
                    let result = engine.grant(req.actor, req.resource, addr("intruder"), admin());
                    *slot.lock().unwrap() = Some(result.is_err_and(|e| matches!(e, PermissionError::Reentrant)));
                }
                true
            })),
        );

        // ROOT on r held conditionally: authorization runs the condition
        // while the grant below is in flight.
        let r = addr("r");
        let y = addr("y");
        engine
            .grant_with_condition(h, r, y, PermissionId::root(), handle)
            .unwrap();
        engine.grant(y, r, addr("z"), admin()).unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(true));
        assert_eq!(engine.get_permission_value(r, addr("intruder"), admin()), PermissionValue::Unset);
    }

    #[test]
    fn test_events_follow_operation_order() {
        let h = addr("h");
        let engine = engine_with_root(h);
        let mut rx = engine.subscribe().unwrap();
        let r = addr("r");

        engine
            .bulk(
                h,
                r,
                &[
                    PermissionOperation::grant(addr("a"), admin()),
                    PermissionOperation::revoke(addr("a"), admin()),
                    PermissionOperation::freeze(admin()),
                ],
            )
            .unwrap();

        let events = rx.drain();
        let kinds: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, ["granted", "revoked", "frozen"]);
        let batch = events[0].metadata().batch_id;
        assert!(events.iter().all(|e| e.metadata().batch_id == batch));
    }

    #[test]
    fn test_persisted_tables_survive_rebuild() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let h = addr("h");
        let r = addr("r");
        {
            let engine = PermissionEngine::builder()
                .with_kv_store(Arc::clone(&kv))
                .with_initial_root_holder(h)
                .build()
                .unwrap();
            engine.grant(h, r, addr("x"), admin()).unwrap();
            engine.freeze(h, r, PermissionId::named("UPGRADE")).unwrap();
        }

        let engine = PermissionEngine::builder()
            .with_kv_store(kv)
            .with_initial_root_holder(addr("someone-else"))
            .build()
            .unwrap();
        assert!(engine.is_initialized());
        assert!(engine.check(r, addr("x"), admin(), &[]));
        assert!(engine.is_frozen(r, PermissionId::named("UPGRADE")));
        assert!(!engine.is_authorized(addr("someone-else"), r));
    }

    #[test]
    fn test_subscriber_may_mutate_after_commit() {
        let h = addr("h");
        let r = addr("r");
        let engine = Arc::new(engine_with_root(h));
        let weak = Arc::downgrade(&engine);
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        engine
            .event_bus()
            .unwrap()
            .registry()
            .register(Arc::new(move |event: &PermissionEvent| {
                if event.event_type() != "frozen" {
                    return;
                }
                if let Some(engine) = weak.upgrade() {
                    sink.lock().unwrap().push(engine.grant(h, r, addr("x"), admin()));
                }
            }));
        let mut rx = engine.subscribe().unwrap();

        engine.freeze(h, r, PermissionId::named("UPGRADE")).unwrap();

        assert!(matches!(outcomes.lock().unwrap().as_slice(), [Ok(())]));
        assert!(engine.check(r, addr("x"), admin(), &[]));
        let kinds: Vec<_> = rx.drain().iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, ["frozen", "granted"]);
    }

    #[test]
    fn test_with_config() {
        let mut config = Config::default();
        config.engine.initial_root_holder = Some(addr("h").to_hex());
        config.engine.restricted_wildcard_permissions = vec!["MINT".to_owned()];
        config.events.enabled = false;

        let engine = PermissionEngine::from_config(&config).unwrap();
        assert_eq!(engine.identity(), DEFAULT_ENGINE_IDENTITY);
        assert!(engine.is_initialized());
        assert!(engine.subscribe().is_none());
        assert!(matches!(
            engine.grant(addr("h"), addr("r"), Address::ANY, PermissionId::named("MINT")),
            Err(PermissionError::RestrictedForWildcard { .. })
        ));
    }

    #[test]
    fn test_with_config_rejects_bad_address() {
        let mut config = Config::default();
        config.engine.identity = "0x1234".to_owned();
        assert!(matches!(
            PermissionEngine::from_config(&config),
            Err(PermissionError::InvalidConfig(_))
        ));
    }
}
