//! Atomic batches of grant/revoke/freeze operations.

use serde::{Deserialize, Serialize};
use warden_core::{Address, ConditionHandle, PermissionId};

use crate::error::{PermissionError, PermissionResult};
use crate::transaction::Transaction;

/// What a batch item does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Grant `Allow`.
    Grant,
    /// Revoke.
    Revoke,
    /// Freeze `(resource, permission_id)`. The actor is ignored.
    Freeze,
    /// Grant `Conditional(handle)`.
    GrantWithCondition(ConditionHandle),
}

/// One item of a single-resource batch.
///
/// `actor` is required for every kind except [`OperationKind::Freeze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOperation {
    /// What to do.
    pub kind: OperationKind,
    /// Permission affected.
    pub permission_id: PermissionId,
    /// Actor affected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Address>,
}

impl PermissionOperation {
    /// Grant `permission_id` to `actor`.
    #[must_use]
    pub const fn grant(actor: Address, permission_id: PermissionId) -> Self {
        Self {
            kind: OperationKind::Grant,
            permission_id,
            actor: Some(actor),
        }
    }

    /// Grant `permission_id` to `actor`, decided by `condition`.
    #[must_use]
    pub const fn grant_with_condition(
        actor: Address,
        permission_id: PermissionId,
        condition: ConditionHandle,
    ) -> Self {
        Self {
            kind: OperationKind::GrantWithCondition(condition),
            permission_id,
            actor: Some(actor),
        }
    }

    /// Revoke `permission_id` from `actor`.
    #[must_use]
    pub const fn revoke(actor: Address, permission_id: PermissionId) -> Self {
        Self {
            kind: OperationKind::Revoke,
            permission_id,
            actor: Some(actor),
        }
    }

    /// Freeze `permission_id`.
    #[must_use]
    pub const fn freeze(permission_id: PermissionId) -> Self {
        Self {
            kind: OperationKind::Freeze,
            permission_id,
            actor: None,
        }
    }

    /// Scope this operation to `resource`.
    #[must_use]
    pub const fn on(self, resource: Address) -> MultiTargetOperation {
        MultiTargetOperation {
            resource,
            operation: self,
        }
    }
}

/// One item of a multi-resource batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiTargetOperation {
    /// Resource this item applies to.
    pub resource: Address,
    /// The operation.
    #[serde(flatten)]
    pub operation: PermissionOperation,
}

/// Sequences batch items through a transaction.
///
/// The first failing item aborts the batch with
/// [`PermissionError::BatchAborted`]; the caller drops the transaction, so
/// nothing applied by earlier items survives.
pub(crate) struct BulkExecutor<'t, 'a> {
    tx: &'t mut Transaction<'a>,
    caller: Address,
}

impl<'t, 'a> BulkExecutor<'t, 'a> {
    pub(crate) fn new(tx: &'t mut Transaction<'a>, caller: Address) -> Self {
        Self { tx, caller }
    }

    pub(crate) fn run<'o>(
        &mut self,
        items: impl IntoIterator<Item = (Address, &'o PermissionOperation)>,
    ) -> PermissionResult<()> {
        for (index, (resource, op)) in items.into_iter().enumerate() {
            self.apply(resource, op)
                .map_err(|cause| PermissionError::BatchAborted {
                    index,
                    cause: Box::new(cause),
                })?;
        }
        Ok(())
    }

    fn apply(&mut self, resource: Address, op: &PermissionOperation) -> PermissionResult<()> {
        let caller = self.caller;
        let actor = || {
            op.actor.ok_or(PermissionError::InvalidOperation(
                "grant and revoke operations require an actor",
            ))
        };
        match op.kind {
            OperationKind::Grant => self.tx.grant(caller, resource, actor()?, op.permission_id, None),
            OperationKind::GrantWithCondition(handle) => {
                self.tx
                    .grant(caller, resource, actor()?, op.permission_id, Some(handle))
            },
            OperationKind::Revoke => self.tx.revoke(caller, resource, actor()?, op.permission_id),
            OperationKind::Freeze => self.tx.freeze(caller, resource, op.permission_id),
        }
    }
}
