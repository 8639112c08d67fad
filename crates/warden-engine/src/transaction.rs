//! Staged mutations.
//!
//! Every administrative call runs inside a [`Transaction`]: a private clone
//! of the engine state that operations are applied to in order, plus the
//! storage writes and events they produce. Nothing is visible to readers
//! until the engine commits the finished transaction; dropping it discards
//! everything.

use uuid::Uuid;
use warden_core::{Address, ConditionHandle, PermissionId, PermissionValue};
use warden_events::{EventMetadata, PermissionEvent};
use warden_storage::KvWrite;

use crate::condition::ConditionEvaluator;
use crate::error::{PermissionError, PermissionResult};
use crate::guard::AuthorizationGuard;
use crate::key::{FreezeKey, PermissionKey};
use crate::persist::Persistence;
use crate::state::EngineState;

/// `source` recorded in event metadata.
pub const EVENT_SOURCE: &str = "warden-engine";

/// Output of a finished transaction.
#[derive(Debug)]
pub(crate) struct Staged {
    pub(crate) state: EngineState,
    pub(crate) writes: Vec<KvWrite>,
    pub(crate) events: Vec<PermissionEvent>,
}

pub(crate) struct Transaction<'a> {
    guard: &'a AuthorizationGuard,
    evaluator: &'a ConditionEvaluator,
    persistence: Option<&'a Persistence>,
    state: EngineState,
    writes: Vec<KvWrite>,
    events: Vec<PermissionEvent>,
    batch_id: Uuid,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        guard: &'a AuthorizationGuard,
        evaluator: &'a ConditionEvaluator,
        persistence: Option<&'a Persistence>,
        state: EngineState,
    ) -> Self {
        Self {
            guard,
            evaluator,
            persistence,
            state,
            writes: Vec::new(),
            events: Vec::new(),
            batch_id: Uuid::new_v4(),
        }
    }

    pub(crate) fn finish(self) -> Staged {
        Staged {
            state: self.state,
            writes: self.writes,
            events: self.events,
        }
    }

    fn metadata(&self) -> EventMetadata {
        EventMetadata::new(EVENT_SOURCE).with_batch(self.batch_id)
    }

    fn authorize(&self, caller: Address, resource: Address) -> PermissionResult<()> {
        self.guard
            .authorize(&self.state, self.evaluator, caller, resource)
    }

    fn ensure_not_frozen(&self, key: &FreezeKey) -> PermissionResult<()> {
        if self.state.freezes.is_frozen(key) {
            return Err(PermissionError::Frozen {
                resource: key.resource,
                permission_id: key.permission_id,
            });
        }
        Ok(())
    }

    fn set_value(&mut self, key: PermissionKey, value: PermissionValue) -> PermissionResult<()> {
        if let Some(persistence) = self.persistence {
            self.writes.push(persistence.grant_write(&key, value)?);
        }
        self.state.store.set(key, value);
        Ok(())
    }

    /// Assign ROOT on the engine to `root_holder`. Runs once per engine.
    pub(crate) fn initialize(&mut self, root_holder: Address) -> PermissionResult<()> {
        let engine = self.guard.engine();
        if self.state.initialized {
            return Err(PermissionError::AlreadyInitialized { engine });
        }
        if root_holder.is_any() {
            return Err(PermissionError::WildcardDisallowed(
                "the initial ROOT holder must be a concrete address",
            ));
        }

        let key = PermissionKey::new(engine, root_holder, PermissionId::root());
        if let Some(persistence) = self.persistence {
            self.writes.push(persistence.init_write(engine, root_holder)?);
        }
        self.set_value(key, PermissionValue::Allow)?;
        self.state.initialized = true;

        self.events.push(PermissionEvent::Initialized {
            metadata: self.metadata(),
            engine,
            root_holder,
        });
        self.events.push(PermissionEvent::Granted {
            metadata: self.metadata(),
            caller: engine,
            resource: engine,
            actor: root_holder,
            permission_id: PermissionId::root(),
            value: PermissionValue::Allow,
        });
        Ok(())
    }

    /// Grant `Allow`, or `Conditional` when a condition is given.
    pub(crate) fn grant(
        &mut self,
        caller: Address,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
        condition: Option<ConditionHandle>,
    ) -> PermissionResult<()> {
        self.authorize(caller, resource)?;
        let key = PermissionKey::new(resource, actor, permission_id);
        self.ensure_not_frozen(&key.freeze_key())?;

        self.guard
            .check_grant_target(resource, actor, permission_id)?;
        let value = match condition {
            Some(handle) if !self.evaluator.registry().contains(handle) => {
                return Err(PermissionError::ConditionNotRegistered(handle));
            },
            Some(handle) => PermissionValue::Conditional(handle),
            None => PermissionValue::Allow,
        };

        if self.state.store.get(&key).is_set() {
            return Err(PermissionError::AlreadyGranted {
                resource,
                actor,
                permission_id,
            });
        }

        self.set_value(key, value)?;
        self.events.push(PermissionEvent::Granted {
            metadata: self.metadata(),
            caller,
            resource,
            actor,
            permission_id,
            value,
        });
        Ok(())
    }

    pub(crate) fn revoke(
        &mut self,
        caller: Address,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
    ) -> PermissionResult<()> {
        self.authorize(caller, resource)?;

        let key = PermissionKey::new(resource, actor, permission_id);
        self.ensure_not_frozen(&key.freeze_key())?;
        if !self.state.store.get(&key).is_set() {
            return Err(PermissionError::AlreadyRevoked {
                resource,
                actor,
                permission_id,
            });
        }

        self.set_value(key, PermissionValue::Unset)?;
        self.events.push(PermissionEvent::Revoked {
            metadata: self.metadata(),
            caller,
            resource,
            actor,
            permission_id,
        });
        Ok(())
    }

    pub(crate) fn freeze(
        &mut self,
        caller: Address,
        resource: Address,
        permission_id: PermissionId,
    ) -> PermissionResult<()> {
        self.authorize(caller, resource)?;
        if resource.is_any() {
            return Err(PermissionError::WildcardDisallowed(
                "the wildcard resource cannot be frozen",
            ));
        }

        let key = FreezeKey::new(resource, permission_id);
        if self.state.freezes.is_frozen(&key) {
            return Err(PermissionError::AlreadyFrozen {
                resource,
                permission_id,
            });
        }

        if let Some(persistence) = self.persistence {
            self.writes.push(persistence.freeze_write(&key)?);
        }
        self.state.freezes.freeze(key);
        self.events.push(PermissionEvent::Frozen {
            metadata: self.metadata(),
            caller,
            resource,
            permission_id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        guard: AuthorizationGuard,
        evaluator: ConditionEvaluator,
        owner: Address,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                guard: AuthorizationGuard::new(Address::derive("engine")),
                evaluator: ConditionEvaluator::default(),
                owner: Address::derive("owner"),
            }
        }

        fn initialized(&self) -> EngineState {
            let mut tx = Transaction::new(&self.guard, &self.evaluator, None, EngineState::default());
            tx.initialize(self.owner).unwrap();
            tx.finish().state
        }
    }

    #[test]
    fn test_initialize_emits_initialized_then_granted() {
        let fx = Fixture::new();
        let mut tx = Transaction::new(&fx.guard, &fx.evaluator, None, EngineState::default());
        tx.initialize(fx.owner).unwrap();
        assert!(matches!(
            tx.initialize(fx.owner),
            Err(PermissionError::AlreadyInitialized { .. })
        ));

        let staged = tx.finish();
        let kinds: Vec<_> = staged.events.iter().map(PermissionEvent::event_type).collect();
        assert_eq!(kinds, ["initialized", "granted"]);
        assert!(staged.writes.is_empty());
        let batch = staged.events[0].metadata().batch_id;
        assert!(batch.is_some());
        assert_eq!(staged.events[1].metadata().batch_id, batch);
    }

    #[test]
    fn test_initialize_rejects_wildcard_holder() {
        let fx = Fixture::new();
        let mut tx = Transaction::new(&fx.guard, &fx.evaluator, None, EngineState::default());
        assert!(matches!(
            tx.initialize(Address::ANY),
            Err(PermissionError::WildcardDisallowed(_))
        ));
    }

    #[test]
    fn test_failed_operation_leaves_staged_state_untouched() {
        let fx = Fixture::new();
        let dao = Address::derive("dao");
        let admin = PermissionId::named("ADMIN");
        let mut tx = Transaction::new(&fx.guard, &fx.evaluator, None, fx.initialized());

        tx.grant(fx.owner, dao, fx.owner, admin, None).unwrap();
        let before = tx.state.store.len();
        assert!(matches!(
            tx.grant(fx.owner, dao, fx.owner, admin, None),
            Err(PermissionError::AlreadyGranted { .. })
        ));
        assert_eq!(tx.state.store.len(), before);
        assert_eq!(tx.events.len(), 1);
    }

    #[test]
    fn test_unregistered_condition_rejected() {
        let fx = Fixture::new();
        let handle = ConditionHandle::new(Address::derive("nowhere"));
        let mut tx = Transaction::new(&fx.guard, &fx.evaluator, None, fx.initialized());
        assert!(matches!(
            tx.grant(
                fx.owner,
                Address::derive("dao"),
                Address::derive("alice"),
                PermissionId::named("EXECUTE"),
                Some(handle),
            ),
            Err(PermissionError::ConditionNotRegistered(h)) if h == handle
        ));
    }

    #[test]
    fn test_wildcard_resource_cannot_be_frozen() {
        let fx = Fixture::new();
        let mut tx = Transaction::new(&fx.guard, &fx.evaluator, None, fx.initialized());
        assert!(matches!(
            tx.freeze(fx.owner, Address::ANY, PermissionId::named("ADMIN")),
            Err(PermissionError::WildcardDisallowed(_))
        ));
    }
}
