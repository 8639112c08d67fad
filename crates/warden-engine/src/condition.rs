//! Conditional grants.
//!
//! A [`PermissionValue::Conditional`](warden_core::PermissionValue) grant
//! names a [`ConditionHandle`]. At check time the [`ConditionEvaluator`]
//! looks the handle up in the [`ConditionRegistry`] and asks the policy
//! object. The answer is never cached.

use dashmap::DashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::warn;
use warden_core::{Address, ConditionHandle, PermissionId};

/// Arguments passed to a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionRequest<'a> {
    /// Resource being checked.
    pub resource: Address,
    /// Actor being checked.
    pub actor: Address,
    /// Permission being checked.
    pub permission_id: PermissionId,
    /// Auxiliary call data supplied to `check` (empty for authorization).
    pub data: &'a [u8],
}

/// A dynamic policy object deciding a conditional grant.
///
/// Implementations must be pure with respect to the engine: calling a
/// mutating engine method from `is_granted` is rejected with
/// [`PermissionError::Reentrant`](crate::PermissionError::Reentrant).
/// Reentry is only detected on the evaluating thread: handing the mutation
/// to another thread and waiting for it deadlocks.
pub trait PermissionCondition: Send + Sync {
    /// Whether the request is allowed.
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool;

    /// Short name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Conditions keyed by handle.
#[derive(Default)]
pub struct ConditionRegistry {
    conditions: DashMap<ConditionHandle, Arc<dyn PermissionCondition>>,
}

impl std::fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("count", &self.conditions.len())
            .finish()
    }
}

impl ConditionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `condition` under `handle`, returning the one it replaced.
    pub fn register(
        &self,
        handle: ConditionHandle,
        condition: Arc<dyn PermissionCondition>,
    ) -> Option<Arc<dyn PermissionCondition>> {
        self.conditions.insert(handle, condition)
    }

    /// Remove the condition under `handle`.
    pub fn unregister(&self, handle: ConditionHandle) -> Option<Arc<dyn PermissionCondition>> {
        self.conditions.remove(&handle).map(|(_, c)| c)
    }

    /// Whether a condition is registered under `handle`.
    #[must_use]
    pub fn contains(&self, handle: ConditionHandle) -> bool {
        self.conditions.contains_key(&handle)
    }

    /// Look up a condition. The returned `Arc` is detached from the map so
    /// no shard lock is held while it runs.
    #[must_use]
    pub fn get(&self, handle: ConditionHandle) -> Option<Arc<dyn PermissionCondition>> {
        self.conditions.get(&handle).map(|c| Arc::clone(c.value()))
    }

    /// Number of registered conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether no condition is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Runs conditions for the check path. Fails closed.
#[derive(Debug, Clone, Default)]
pub struct ConditionEvaluator {
    registry: Arc<ConditionRegistry>,
}

impl ConditionEvaluator {
    /// Evaluator over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConditionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry conditions are looked up in.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConditionRegistry> {
        &self.registry
    }

    /// Ask the condition under `handle`.
    ///
    /// An unregistered handle or a panicking condition denies.
    #[must_use]
    pub fn evaluate(&self, handle: ConditionHandle, request: &ConditionRequest<'_>) -> bool {
        let Some(condition) = self.registry.get(handle) else {
            warn!(%handle, resource = %request.resource, "condition not registered, denying");
            return false;
        };

        if let Ok(granted) = catch_unwind(AssertUnwindSafe(|| condition.is_granted(request))) {
            granted
        } else {
            warn!(
                %handle,
                condition = condition.name(),
                resource = %request.resource,
                "condition panicked, denying"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::FnCondition;

    fn request(data: &[u8]) -> ConditionRequest<'_> {
        ConditionRequest {
            resource: Address::derive("dao"),
            actor: Address::derive("alice"),
            permission_id: PermissionId::named("EXECUTE"),
            data,
        }
    }

    #[test]
    fn test_registered_condition_decides() {
        let registry = Arc::new(ConditionRegistry::new());
        let handle = ConditionHandle::new(Address::derive("non-empty"));
        registry.register(handle, Arc::new(FnCondition::new(|r| !r.data.is_empty())));

        let evaluator = ConditionEvaluator::new(Arc::clone(&registry));
        assert!(evaluator.evaluate(handle, &request(b"x")));
        assert!(!evaluator.evaluate(handle, &request(b"")));
    }

    #[test]
    fn test_unregistered_handle_denies() {
        let evaluator = ConditionEvaluator::default();
        let handle = ConditionHandle::new(Address::derive("missing"));
        assert!(!evaluator.evaluate(handle, &request(b"")));
    }

    #[test]
    fn test_panicking_condition_denies() {
        let registry = Arc::new(ConditionRegistry::new());
        let handle = ConditionHandle::new(Address::derive("boom"));
        registry.register(
            handle,
            Arc::new(FnCondition::new(|_| panic!("condition failure"))),
        );

        let evaluator = ConditionEvaluator::new(registry);
        assert!(!evaluator.evaluate(handle, &request(b"")));
    }

    #[test]
    fn test_register_replaces_and_unregister_removes() {
        let registry = ConditionRegistry::new();
        let handle = ConditionHandle::new(Address::derive("c"));

        assert!(registry.register(handle, Arc::new(FnCondition::new(|_| true))).is_none());
        assert!(registry.register(handle, Arc::new(FnCondition::new(|_| false))).is_some());
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(handle).is_some());
        assert!(!registry.contains(handle));
    }
}
