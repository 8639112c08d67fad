//! Common imports for engine users.
//!
//! ```rust
//! use warden_engine::prelude::*;
//! ```

pub use crate::builtin::{ActorAllowlist, AllOf, AnyOf, CallSelector, FnCondition, TimeWindow};
pub use crate::{
    Address, ConditionHandle, EngineBuilder, MultiTargetOperation, OperationKind,
    PermissionCondition, PermissionEngine, PermissionError, PermissionId, PermissionOperation,
    PermissionResult, PermissionValue,
};
