//! Warden Core - identity types shared by every Warden crate.
//!
//! This crate provides:
//! - [`Address`]: the 20-byte identity of a resource, an actor, a condition
//!   or the engine itself, including the reserved [`Address::ANY`] wildcard
//! - [`PermissionId`]: the 32-byte identifier naming a capability, derived
//!   from a human-readable name
//! - [`PermissionValue`]: what is stored per grant key (unset, allow, or a
//!   [`ConditionHandle`] evaluated at check time)
//! - Parse errors for addresses and permission ids
//!
//! # Example
//!
//! ```
//! use warden_core::{Address, PermissionId};
//!
//! let dao = Address::derive("dao");
//! assert!(!dao.is_any());
//! assert!(Address::ANY.is_any());
//!
//! let admin = PermissionId::named("ADMIN");
//! assert_eq!(admin, "ADMIN".parse::<PermissionId>().unwrap());
//! assert!(PermissionId::root().is_root());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod address;
mod error;
mod permission;
mod value;

pub use address::Address;
pub use error::{CoreError, CoreResult};
pub use permission::{PermissionId, ROOT_PERMISSION_NAME};
pub use value::{ConditionHandle, PermissionValue};
