//! Warden Engine - a capability-based authorization kernel.
//!
//! This crate provides:
//! - [`PermissionEngine`]: grant, revoke and freeze permissions on resources,
//!   and check them
//! - Conditional grants decided at check time by a [`PermissionCondition`]
//! - Atomic batches ([`PermissionEngine::bulk`],
//!   [`PermissionEngine::bulk_multi_target`])
//! - Write-through persistence to a [`warden_storage::KvStore`]
//!
//! # Model
//!
//! A grant is keyed by `(resource, actor, permission)` and holds `Allow` or
//! `Conditional(handle)`. Either address may be [`Address::ANY`], which
//! matches every concrete address during a check. `check` resolves the
//! exact key first, then the any-actor key, then the any-resource key, and
//! the first set value decides.
//!
//! Holding ROOT on a resource authorizes changing any permission on it.
//! Holding ROOT on the engine's identity authorizes changing any permission
//! anywhere. A frozen `(resource, permission)` pair can never be granted,
//! revoked or frozen again.
//!
//! # Example
//!
//! ```
//! use warden_core::{Address, PermissionId};
//! use warden_engine::{PermissionEngine, PermissionError};
//!
//! let owner = Address::derive("owner");
//! let dao = Address::derive("dao");
//! let alice = Address::derive("alice");
//! let admin = PermissionId::named("ADMIN");
//!
//! let engine = PermissionEngine::builder()
//!     .with_initial_root_holder(owner)
//!     .build()?;
//!
//! engine.grant(owner, dao, alice, admin)?;
//! assert!(engine.check(dao, alice, admin, &[]));
//!
//! engine.freeze(owner, dao, admin)?;
//! assert!(matches!(
//!     engine.revoke(owner, dao, alice, admin),
//!     Err(PermissionError::Frozen { .. })
//! ));
//! # Ok::<(), PermissionError>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod builtin;
pub mod key;
pub mod persist;
pub mod prelude;

mod bulk;
mod check;
mod condition;
mod engine;
mod error;
mod freeze;
mod guard;
mod state;
mod store;
mod transaction;

pub use bulk::{MultiTargetOperation, OperationKind, PermissionOperation};
pub use check::Tier;
pub use condition::{
    ConditionEvaluator, ConditionRegistry, ConditionRequest, PermissionCondition,
};
pub use engine::{DEFAULT_ENGINE_IDENTITY, EngineBuilder, PermissionEngine};
pub use error::{PermissionError, PermissionResult};
pub use freeze::FreezeRegistry;
pub use guard::AuthorizationGuard;
pub use key::{FreezeKey, PermissionKey, derive_freeze_key, derive_permission_key};
pub use state::EngineState;
pub use store::{GrantEntry, PermissionStore};
pub use transaction::EVENT_SOURCE;

pub use warden_core::{Address, ConditionHandle, PermissionId, PermissionValue};
