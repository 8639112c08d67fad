//! Who may administer permissions, and on what.

use std::collections::HashSet;
use warden_core::{Address, PermissionId};

use crate::check::check;
use crate::condition::ConditionEvaluator;
use crate::error::{PermissionError, PermissionResult};
use crate::state::EngineState;

/// Authorization rules for administrative calls.
///
/// A caller may change permissions on `resource` if it holds ROOT on that
/// resource, or ROOT on the engine identity. ROOT is resolved through the
/// ordinary check path, so it may itself be conditional or held by the
/// wildcard actor. A wildcard resource has no holder of its own and can
/// only be administered with engine ROOT.
///
/// Because the any-resource tier applies to every resource, a ROOT grant on
/// the wildcard resource makes its holder an administrator everywhere,
/// the engine identity included. Issuing one already requires engine ROOT.
#[derive(Debug, Clone)]
pub struct AuthorizationGuard {
    engine: Address,
    restricted: HashSet<PermissionId>,
}

impl AuthorizationGuard {
    /// Guard for the engine at `engine`.
    #[must_use]
    pub fn new(engine: Address) -> Self {
        Self {
            engine,
            restricted: HashSet::new(),
        }
    }

    /// Forbid granting `permission_id` to a wildcard actor or resource.
    #[must_use]
    pub fn with_restricted(mut self, permission_id: PermissionId) -> Self {
        self.restricted.insert(permission_id);
        self
    }

    /// The engine identity.
    #[must_use]
    pub fn engine(&self) -> Address {
        self.engine
    }

    /// Whether `permission_id` is restricted for wildcards.
    #[must_use]
    pub fn is_restricted(&self, permission_id: &PermissionId) -> bool {
        self.restricted.contains(permission_id)
    }

    /// Whether `caller` may administer permissions on `resource`.
    #[must_use]
    pub fn is_authorized(
        &self,
        state: &EngineState,
        evaluator: &ConditionEvaluator,
        caller: Address,
        resource: Address,
    ) -> bool {
        let root = PermissionId::root();
        let on_resource = !resource.is_any()
            && resource != self.engine
            && check(state, evaluator, resource, caller, root, &[]);
        on_resource || check(state, evaluator, self.engine, caller, root, &[])
    }

    /// [`Self::is_authorized`] as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Unauthorized`] when the caller is not
    /// authorized.
    pub fn authorize(
        &self,
        state: &EngineState,
        evaluator: &ConditionEvaluator,
        caller: Address,
        resource: Address,
    ) -> PermissionResult<()> {
        if self.is_authorized(state, evaluator, caller, resource) {
            Ok(())
        } else {
            Err(PermissionError::Unauthorized { caller, resource })
        }
    }

    /// Wildcard rules for a new grant.
    ///
    /// # Errors
    ///
    /// - [`PermissionError::WildcardDisallowed`] if both actor and resource
    ///   are the wildcard
    /// - [`PermissionError::RestrictedForWildcard`] if either is and the
    ///   permission is restricted
    pub fn check_grant_target(
        &self,
        resource: Address,
        actor: Address,
        permission_id: PermissionId,
    ) -> PermissionResult<()> {
        if resource.is_any() && actor.is_any() {
            return Err(PermissionError::WildcardDisallowed(
                "a grant may not use the wildcard for both actor and resource",
            ));
        }
        if (resource.is_any() || actor.is_any()) && self.is_restricted(&permission_id) {
            return Err(PermissionError::RestrictedForWildcard { permission_id });
        }
        Ok(())
    }
}
