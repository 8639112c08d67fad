//! Three-tier check resolution.

use tracing::debug;
use warden_core::{Address, PermissionId, PermissionValue};

use crate::condition::{ConditionEvaluator, ConditionRequest};
use crate::key::PermissionKey;
use crate::state::EngineState;

/// Which stored key decided a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// `(resource, actor, id)`.
    Exact,
    /// `(resource, ANY, id)`.
    AnyActor,
    /// `(ANY, actor, id)`.
    AnyResource,
}

impl Tier {
    const ORDER: [Self; 3] = [Self::Exact, Self::AnyActor, Self::AnyResource];

    fn key(self, exact: PermissionKey) -> PermissionKey {
        match self {
            Self::Exact => exact,
            Self::AnyActor => exact.with_any_actor(),
            Self::AnyResource => exact.with_any_resource(),
        }
    }
}

/// The first set value in tier order, and the tier it came from.
///
/// A set value at a narrower tier wins even if a broader tier would allow,
/// so a conditional exact grant is never bypassed by a wildcard `Allow`.
pub(crate) fn resolve_value(
    state: &EngineState,
    resource: Address,
    actor: Address,
    permission_id: PermissionId,
) -> Option<(Tier, PermissionValue)> {
    let exact = PermissionKey::new(resource, actor, permission_id);
    Tier::ORDER.into_iter().find_map(|tier| {
        let value = state.store.get(&tier.key(exact));
        value.is_set().then_some((tier, value))
    })
}

/// Evaluate `check(resource, actor, permission_id, data)` against `state`.
pub(crate) fn check(
    state: &EngineState,
    evaluator: &ConditionEvaluator,
    resource: Address,
    actor: Address,
    permission_id: PermissionId,
    data: &[u8],
) -> bool {
    let Some((tier, value)) = resolve_value(state, resource, actor, permission_id) else {
        debug!(%resource, %actor, %permission_id, "no grant");
        return false;
    };

    let granted = match value {
        PermissionValue::Allow => true,
        PermissionValue::Conditional(handle) => evaluator.evaluate(
            handle,
            &ConditionRequest {
                resource,
                actor,
                permission_id,
                data,
            },
        ),
        PermissionValue::Unset => false,
    };
    debug!(%resource, %actor, %permission_id, ?tier, %value, granted, "check resolved");
    granted
}
