//! Test fixtures.

use std::sync::{Arc, Once};

use warden_core::{Address, PermissionId};
use warden_engine::PermissionEngine;
use warden_storage::KvStore;

/// Stable address for a label. The same label always yields the same
/// address.
#[must_use]
pub fn test_address(label: &str) -> Address {
    Address::derive(label)
}

/// Permission id for a name.
#[must_use]
pub fn test_permission(name: &str) -> PermissionId {
    PermissionId::named(name)
}

/// In-memory engine at the default identity, initialized with ROOT for
/// `holder`, with events enabled.
///
/// # Panics
///
/// Panics if the engine cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn engine_with_root(holder: Address) -> PermissionEngine {
    PermissionEngine::builder()
        .with_initial_root_holder(holder)
        .build()
        .expect("in-memory engine builds")
}

/// Engine backed by `store`, initialized with ROOT for `holder` unless the
/// store already is.
///
/// # Panics
///
/// Panics if the store cannot be loaded.
#[must_use]
#[allow(clippy::expect_used)]
pub fn engine_with_store(holder: Address, store: Arc<dyn KvStore>) -> PermissionEngine {
    PermissionEngine::builder()
        .with_kv_store(store)
        .with_initial_root_holder(holder)
        .build()
        .expect("store-backed engine builds")
}

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Honors `RUST_LOG`;
/// defaults to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_stable_and_distinct() {
        assert_eq!(test_address("a"), test_address("a"));
        assert_ne!(test_address("a"), test_address("b"));
    }

    #[test]
    fn test_engine_with_root_is_initialized() {
        init_test_tracing();
        let owner = test_address("owner");
        let engine = engine_with_root(owner);
        assert!(engine.is_initialized());
        assert!(engine.is_authorized(owner, test_address("anything")));
    }
}
