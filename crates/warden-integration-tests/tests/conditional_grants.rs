//! Conditional grants evaluated through registered policy objects.

mod common;

use std::sync::Arc;

use common::*;
use warden_core::{Address, ConditionHandle, PermissionId};
use warden_engine::builtin::{ActorAllowlist, AllOf, CallSelector};
use warden_engine::{PermissionCondition, PermissionEngine};

fn handle(label: &str) -> ConditionHandle {
    ConditionHandle::new(test_address(label))
}

#[test]
fn condition_sees_call_data() {
    let Cast { h, r, x, .. } = Cast::new();
    let engine = engine_with_root(h);
    let transfer = [0xa9, 0x05, 0x9c, 0xbb];
    let only_transfer = handle("transfer-only");
    engine.register_condition(only_transfer, Arc::new(CallSelector::new([transfer])));

    engine
        .grant_with_condition(h, r, x, execute(), only_transfer)
        .unwrap();

    assert!(engine.check(r, x, execute(), &[0xa9, 0x05, 0x9c, 0xbb, 0x00]));
    assert!(!engine.check(r, x, execute(), &[0x09, 0x5e, 0xa7, 0xb3]));
    assert!(!engine.check(r, x, execute(), &[]));
}

#[test]
fn conditional_root_gates_administration() {
    let Cast { h, r, x, y, .. } = Cast::new();
    let engine = engine_with_root(h);
    let gate = Arc::new(RecordingCondition::denying());
    let gate_handle = handle("gate");
    engine.register_condition(gate_handle, gate.clone());

    engine
        .grant_with_condition(h, r, y, PermissionId::root(), gate_handle)
        .unwrap();
    assert!(!engine.is_authorized(y, r));
    assert!(engine.grant(y, r, x, admin()).is_err());

    gate.set_answer(true);
    engine.grant(y, r, x, admin()).unwrap();

    // Authorization asks with empty call data.
    assert!(gate.requests().iter().all(|req| req.data.is_empty()));
}

#[test]
fn unregistering_a_condition_fails_closed() {
    let Cast { h, r, x, .. } = Cast::new();
    let engine = engine_with_root(h);
    let allow = handle("allow");
    engine.register_condition(allow, Arc::new(RecordingCondition::allowing()));
    engine.grant_with_condition(h, r, x, execute(), allow).unwrap();
    assert!(engine.check(r, x, execute(), &[]));

    assert!(engine.unregister_condition(allow).is_some());
    assert!(!engine.check(r, x, execute(), &[]));
}

#[test]
fn panicking_condition_denies() {
    let Cast { h, r, x, .. } = Cast::new();
    let engine = engine_with_root(h);
    let boom = handle("boom");
    engine.register_condition(boom, Arc::new(PanickingCondition));
    engine.grant_with_condition(h, r, x, execute(), boom).unwrap();

    assert!(!engine.check(r, x, execute(), &[]));
}

#[test]
fn composite_conditions() {
    let Cast { h, r, x, y, .. } = Cast::new();
    let engine = engine_with_root(h);
    let toggle = Arc::new(RecordingCondition::allowing());
    let parts: Vec<Arc<dyn PermissionCondition>> =
        vec![Arc::new(ActorAllowlist::new([x])), toggle.clone()];
    let both = handle("both");
    engine.register_condition(both, Arc::new(AllOf::new(parts)));

    engine
        .grant_with_condition(h, r, Address::ANY, execute(), both)
        .unwrap();
    assert!(engine.check(r, x, execute(), &[]));
    assert!(!engine.check(r, y, execute(), &[]));

    toggle.set_answer(false);
    assert!(!engine.check(r, x, execute(), &[]));
}

#[test]
fn condition_cannot_mutate_the_engine() {
    let Cast { h, r, y, z, .. } = Cast::new();
    let intruder = test_address("intruder");
    let engine = Arc::new(engine_with_root(h));
    let sneaky = Arc::new(ReentrantCondition::new(intruder, admin()));
    sneaky.attach(&engine);
    let sneaky_handle = handle("sneaky");
    engine.register_condition(sneaky_handle, sneaky.clone());

    engine
        .grant_with_condition(h, r, y, PermissionId::root(), sneaky_handle)
        .unwrap();
    // Authorizing Y runs the condition while this grant is in flight.
    engine.grant(y, r, z, admin()).unwrap();

    assert_eq!(sneaky.attempts(), vec![AttemptOutcome::Rejected]);
    assert!(!engine.check(r, intruder, admin(), &[]));
    assert!(engine.check(r, z, admin(), &[]));
}

#[test]
fn conditions_registered_through_builder() {
    let Cast { h, r, x, .. } = Cast::new();
    let allow = handle("allow");
    let engine = PermissionEngine::builder()
        .with_initial_root_holder(h)
        .with_condition(allow, Arc::new(RecordingCondition::allowing()))
        .build()
        .unwrap();

    assert!(engine.conditions().contains(allow));
    engine.grant_with_condition(h, r, x, execute(), allow).unwrap();
    assert!(engine.check(r, x, execute(), &[]));
}
