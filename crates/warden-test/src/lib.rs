//! Warden Test - shared test utilities for the Warden crates.
//!
//! Fixtures build engines and addresses with one call; mocks cover the
//! awkward collaborators (conditions that count, panic or call back into
//! the engine, and a store whose commits can be made to fail).
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! warden-test.workspace = true
//! ```
//!
//! ```rust
//! use warden_test::{RecordingCondition, engine_with_root, test_address};
//! use warden_core::{ConditionHandle, PermissionId};
//! use std::sync::Arc;
//!
//! let owner = test_address("owner");
//! let engine = engine_with_root(owner);
//!
//! let cond = Arc::new(RecordingCondition::allowing());
//! let handle = ConditionHandle::new(test_address("cond"));
//! engine.register_condition(handle, cond.clone());
//!
//! let dao = test_address("dao");
//! let alice = test_address("alice");
//! let execute = PermissionId::named("EXECUTE");
//! engine.grant_with_condition(owner, dao, alice, execute, handle).unwrap();
//!
//! assert!(engine.check(dao, alice, execute, b"payload"));
//! assert_eq!(cond.call_count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
