//! Permission tables survive an engine rebuild over the same store.

mod common;

use std::sync::Arc;

use common::*;
use warden_core::{Address, ConditionHandle, PermissionId, PermissionValue};
use warden_engine::persist::{NS_FREEZES, NS_GRANTS, NS_META};
use warden_engine::{PermissionEngine, PermissionError, derive_permission_key};
use warden_storage::{KvStore, MemoryKvStore};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(f)
}

#[test]
fn rebuilt_engine_sees_grants_and_freezes() {
    let Cast { h, r, x, y, .. } = Cast::new();
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let handle = ConditionHandle::new(test_address("cond"));

    {
        let engine = engine_with_store(h, Arc::clone(&kv));
        engine.register_condition(handle, Arc::new(RecordingCondition::allowing()));
        engine.grant(h, r, x, admin()).unwrap();
        engine.grant_with_condition(h, r, y, execute(), handle).unwrap();
        engine.grant(h, r, Address::ANY, PermissionId::named("VIEW")).unwrap();
        engine.freeze(h, r, admin()).unwrap();
    }

    // No initial holder this time; the stored marker keeps H in place.
    let engine = PermissionEngine::builder()
        .with_kv_store(Arc::clone(&kv))
        .build()
        .unwrap();
    assert!(engine.is_initialized());
    assert!(engine.is_authorized(h, r));
    assert!(engine.check(r, x, admin(), &[]));
    assert!(engine.is_frozen(r, admin()));
    assert_eq!(
        engine.get_permission_value(r, y, execute()),
        PermissionValue::Conditional(handle)
    );
    assert!(engine.check(r, test_address("anyone"), PermissionId::named("VIEW"), &[]));

    // The condition object is not persisted: until it is registered again
    // the conditional grant denies.
    assert!(!engine.check(r, y, execute(), &[]));
    engine.register_condition(handle, Arc::new(RecordingCondition::allowing()));
    assert!(engine.check(r, y, execute(), &[]));

    assert!(matches!(
        engine.initialize(y).unwrap_err(),
        PermissionError::AlreadyInitialized { .. }
    ));
}

#[test]
fn revoke_deletes_the_stored_slot() {
    let Cast { h, r, x, .. } = Cast::new();
    let kv = Arc::new(MemoryKvStore::new());
    let engine = engine_with_store(h, kv.clone());

    engine.grant(h, r, x, admin()).unwrap();
    let slot = derive_permission_key(r, x, admin()).to_hex();
    assert!(block_on(kv.get(NS_GRANTS, &slot)).unwrap().is_some());

    engine.revoke(h, r, x, admin()).unwrap();
    assert!(block_on(kv.get(NS_GRANTS, &slot)).unwrap().is_none());
}

#[test]
fn failed_commit_changes_nothing() {
    let Cast { h, r, x, .. } = Cast::new();
    let kv = Arc::new(FailingKvStore::new());
    let engine = engine_with_store(h, kv.clone());
    let mut rx = engine.subscribe().unwrap();

    kv.fail_batches(true);
    let err = engine.freeze(h, r, admin()).unwrap_err();
    assert!(matches!(err, PermissionError::Storage(_)));
    assert!(!engine.is_frozen(r, admin()));
    assert!(rx.drain().is_empty());
    assert!(block_on(kv.list_keys(NS_FREEZES)).unwrap().is_empty());

    kv.fail_batches(false);
    engine.freeze(h, r, admin()).unwrap();
    engine.grant(h, r, x, execute()).unwrap();
    assert_eq!(rx.drain().len(), 2);
}

#[test]
fn store_from_another_engine_is_refused() {
    let h = test_address("H");
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    drop(engine_with_store(h, Arc::clone(&kv)));
    assert_eq!(block_on(kv.list_keys(NS_META)).unwrap().len(), 1);

    let err = PermissionEngine::builder()
        .with_identity(test_address("other-engine"))
        .with_kv_store(kv)
        .build()
        .unwrap_err();
    assert!(matches!(err, PermissionError::Storage(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_works_inside_a_runtime() {
    let Cast { h, r, x, .. } = Cast::new();
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let engine = engine_with_store(h, Arc::clone(&kv));

    engine.grant(h, r, x, admin()).unwrap();
    let stored = kv.list_keys(NS_GRANTS).await.unwrap();
    // Initial ROOT plus the new grant.
    assert_eq!(stored.len(), 2);
}
