//! Permission engine error types.

use thiserror::Error;
use warden_core::{Address, ConditionHandle, PermissionId};

/// Errors returned by administrative engine calls.
///
/// Every error is fatal to its own call (or to the whole batch for bulk
/// calls); the engine never retries.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The caller holds ROOT neither on the resource nor on the engine.
    #[error("{caller} is not authorized to administer permissions on {resource}")]
    Unauthorized {
        /// The actor that attempted the change.
        caller: Address,
        /// The resource it targeted.
        resource: Address,
    },

    /// Grant attempted on a key that already holds a value.
    #[error("{permission_id} is already granted to {actor} on {resource}")]
    AlreadyGranted {
        /// Target resource.
        resource: Address,
        /// Target actor.
        actor: Address,
        /// Target permission.
        permission_id: PermissionId,
    },

    /// Revoke attempted on a key that holds no value.
    #[error("{permission_id} is not granted to {actor} on {resource}")]
    AlreadyRevoked {
        /// Target resource.
        resource: Address,
        /// Target actor.
        actor: Address,
        /// Target permission.
        permission_id: PermissionId,
    },

    /// Freeze attempted on a pair that is already frozen.
    #[error("{permission_id} is already frozen on {resource}")]
    AlreadyFrozen {
        /// Target resource.
        resource: Address,
        /// Target permission.
        permission_id: PermissionId,
    },

    /// Grant or revoke attempted on a frozen pair.
    #[error("{permission_id} is frozen on {resource}")]
    Frozen {
        /// Target resource.
        resource: Address,
        /// Target permission.
        permission_id: PermissionId,
    },

    /// A bulk batch failed; nothing from the batch was applied.
    #[error("batch aborted at operation {index}: {cause}")]
    BatchAborted {
        /// Position of the failing operation.
        index: usize,
        /// Why it failed.
        #[source]
        cause: Box<PermissionError>,
    },

    /// `initialize` was called on an initialized engine.
    #[error("engine {engine} is already initialized")]
    AlreadyInitialized {
        /// The engine identity.
        engine: Address,
    },

    /// The wildcard address was used where a concrete address is required.
    #[error("wildcard not allowed: {0}")]
    WildcardDisallowed(&'static str),

    /// The permission may never be granted to a wildcard actor or resource.
    #[error("{permission_id} may not be granted to a wildcard actor or resource")]
    RestrictedForWildcard {
        /// The restricted permission.
        permission_id: PermissionId,
    },

    /// No condition is registered under the handle.
    #[error("no condition registered for {0}")]
    ConditionNotRegistered(ConditionHandle),

    /// A batch item is malformed.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A mutating call re-entered the engine from inside a running mutation.
    #[error("reentrant mutation rejected")]
    Reentrant,

    /// The engine could not be built from its configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Loading or committing to the backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PermissionError {
    /// The innermost error, looking through [`PermissionError::BatchAborted`].
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::BatchAborted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl From<warden_storage::StorageError> for PermissionError {
    fn from(e: warden_storage::StorageError) -> Self {
        match e {
            warden_storage::StorageError::Codec(msg) => Self::Serialization(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Result type for permission engine operations.
pub type PermissionResult<T> = Result<T, PermissionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_batch_aborted_exposes_cause() {
        let cause = PermissionError::AlreadyFrozen {
            resource: Address::derive("dao"),
            permission_id: PermissionId::named("UPGRADE"),
        };
        let err = PermissionError::BatchAborted {
            index: 2,
            cause: Box::new(cause),
        };

        assert!(err.to_string().starts_with("batch aborted at operation 2"));
        assert!(err.source().is_some());
        assert!(matches!(
            err.root_cause(),
            PermissionError::AlreadyFrozen { .. }
        ));
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: PermissionError =
            warden_storage::StorageError::Codec("bad json".into()).into();
        assert!(matches!(err, PermissionError::Serialization(_)));

        let err: PermissionError = warden_storage::StorageError::Backend("disk".into()).into();
        assert!(matches!(err, PermissionError::Storage(_)));
    }
}
