//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_core::prelude::*;` to import all essential types.

pub use crate::{
    Address, ConditionHandle, CoreError, CoreResult, PermissionId, PermissionValue,
    ROOT_PERMISSION_NAME,
};
