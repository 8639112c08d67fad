//! Mock collaborators for engine tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use async_trait::async_trait;
use warden_core::{Address, PermissionId};
use warden_engine::{ConditionRequest, PermissionCondition, PermissionEngine, PermissionError};
use warden_storage::{KvStore, KvWrite, MemoryKvStore, StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Owned copy of a [`ConditionRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Resource checked.
    pub resource: Address,
    /// Actor checked.
    pub actor: Address,
    /// Permission checked.
    pub permission_id: PermissionId,
    /// Call data.
    pub data: Vec<u8>,
}

impl From<&ConditionRequest<'_>> for RecordedRequest {
    fn from(req: &ConditionRequest<'_>) -> Self {
        Self {
            resource: req.resource,
            actor: req.actor,
            permission_id: req.permission_id,
            data: req.data.to_vec(),
        }
    }
}

/// Condition with a switchable answer that records every request.
#[derive(Debug, Default)]
pub struct RecordingCondition {
    answer: AtomicBool,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl RecordingCondition {
    /// Condition answering `answer`.
    #[must_use]
    pub fn new(answer: bool) -> Self {
        Self {
            answer: AtomicBool::new(answer),
            ..Self::default()
        }
    }

    /// Condition that grants.
    #[must_use]
    pub fn allowing() -> Self {
        Self::new(true)
    }

    /// Condition that denies.
    #[must_use]
    pub fn denying() -> Self {
        Self::new(false)
    }

    /// Change the answer for subsequent calls.
    pub fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }

    /// Number of times the condition was asked.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests seen so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PermissionCondition for RecordingCondition {
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest::from(request));
        self.answer.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Condition that always panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanickingCondition;

impl PermissionCondition for PanickingCondition {
    fn is_granted(&self, _request: &ConditionRequest<'_>) -> bool {
        panic!("condition failure")
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// What happened when a [`ReentrantCondition`] called back into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The engine rejected the call as reentrant.
    Rejected,
    /// The mutation went through.
    Applied,
    /// The engine returned some other error.
    Failed(String),
}

/// Condition that tries to grant from inside its own evaluation.
///
/// When asked about `(resource, actor, _)` it calls
/// `engine.grant(actor, resource, intruder, permission_id)` and records the
/// outcome, then answers `true`.
#[derive(Debug)]
pub struct ReentrantCondition {
    engine: OnceLock<Weak<PermissionEngine>>,
    intruder: Address,
    permission_id: PermissionId,
    attempts: Mutex<Vec<AttemptOutcome>>,
}

impl ReentrantCondition {
    /// Condition that will try to grant `permission_id` to `intruder`.
    #[must_use]
    pub fn new(intruder: Address, permission_id: PermissionId) -> Self {
        Self {
            engine: OnceLock::new(),
            intruder,
            permission_id,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Point the condition at its engine. Only the first call takes effect.
    pub fn attach(&self, engine: &Arc<PermissionEngine>) {
        let _ = self.engine.set(Arc::downgrade(engine));
    }

    /// Outcomes of every callback so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<AttemptOutcome> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PermissionCondition for ReentrantCondition {
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool {
        let Some(engine) = self.engine.get().and_then(Weak::upgrade) else {
            return true;
        };
        let outcome = match engine.grant(
            request.actor,
            request.resource,
            self.intruder,
            self.permission_id,
        ) {
            Ok(()) => AttemptOutcome::Applied,
            Err(PermissionError::Reentrant) => AttemptOutcome::Rejected,
            Err(e) => AttemptOutcome::Failed(e.to_string()),
        };
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
        true
    }

    fn name(&self) -> &str {
        "reentrant"
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// In-memory store whose batch commits can be made to fail.
///
/// Reads and single-key writes always go to the inner store.
#[derive(Debug, Default)]
pub struct FailingKvStore {
    inner: MemoryKvStore,
    fail_batches: AtomicBool,
    batches: AtomicUsize,
}

impl FailingKvStore {
    /// Store that commits normally until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `apply_batch` calls fail (or succeed again).
    pub fn fail_batches(&self, fail: bool) {
        self.fail_batches.store(fail, Ordering::SeqCst);
    }

    /// Number of batches committed successfully.
    #[must_use]
    pub fn committed_batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// The backing store.
    #[must_use]
    pub fn inner(&self) -> &MemoryKvStore {
        &self.inner
    }
}

#[async_trait]
impl KvStore for FailingKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(namespace, key).await
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(namespace, key, value).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        self.inner.delete(namespace, key).await
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        self.inner.list_keys(namespace).await
    }

    async fn apply_batch(&self, writes: Vec<KvWrite>) -> StorageResult<()> {
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected batch failure".into()));
        }
        self.inner.apply_batch(writes).await?;
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{engine_with_root, engine_with_store, test_address, test_permission};
    use warden_core::{ConditionHandle, PermissionValue};

    #[test]
    fn test_recording_condition_records_call_data() {
        let owner = test_address("owner");
        let engine = engine_with_root(owner);
        let cond = Arc::new(RecordingCondition::denying());
        let handle = ConditionHandle::new(test_address("cond"));
        engine.register_condition(handle, cond.clone());

        let r = test_address("r");
        let a = test_address("a");
        let exec = test_permission("EXECUTE");
        engine.grant_with_condition(owner, r, a, exec, handle).unwrap();

        assert!(!engine.check(r, a, exec, b"\x01\x02"));
        cond.set_answer(true);
        assert!(engine.check(r, a, exec, b""));

        let seen = cond.requests();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].data, vec![1, 2]);
        assert_eq!(seen[0].resource, r);
        assert_eq!(seen[1].actor, a);
    }

    #[test]
    fn test_panicking_condition_denies() {
        let owner = test_address("owner");
        let engine = engine_with_root(owner);
        let handle = ConditionHandle::new(test_address("boom"));
        engine.register_condition(handle, Arc::new(PanickingCondition));

        let r = test_address("r");
        let a = test_address("a");
        let exec = test_permission("EXECUTE");
        engine.grant_with_condition(owner, r, a, exec, handle).unwrap();
        assert!(!engine.check(r, a, exec, b""));
    }

    #[test]
    fn test_failing_store_keeps_state() {
        let kv = Arc::new(FailingKvStore::new());
        let owner = test_address("owner");
        let engine = engine_with_store(owner, kv.clone());
        let before = kv.committed_batches();

        kv.fail_batches(true);
        let r = test_address("r");
        let a = test_address("a");
        let admin = test_permission("ADMIN");
        let err = engine.grant(owner, r, a, admin).unwrap_err();
        assert!(matches!(err, PermissionError::Storage(_)));
        assert_eq!(
            engine.get_permission_value(r, a, admin),
            PermissionValue::Unset
        );
        assert_eq!(kv.committed_batches(), before);

        kv.fail_batches(false);
        engine.grant(owner, r, a, admin).unwrap();
        assert_eq!(kv.committed_batches(), before.saturating_add(1));
    }
}
