//! Shared helpers for the integration tests.

#![allow(dead_code)]

use warden_core::{Address, PermissionId};
pub use warden_test::prelude::*;

pub fn admin() -> PermissionId {
    PermissionId::named("ADMIN")
}

pub fn execute() -> PermissionId {
    PermissionId::named("EXECUTE")
}

/// The usual cast: root holder `H`, resource `R` and actors `X`, `Y`, `Z`.
pub struct Cast {
    pub h: Address,
    pub r: Address,
    pub x: Address,
    pub y: Address,
    pub z: Address,
}

impl Cast {
    pub fn new() -> Self {
        Self {
            h: test_address("H"),
            r: test_address("R"),
            x: test_address("X"),
            y: test_address("Y"),
            z: test_address("Z"),
        }
    }
}
