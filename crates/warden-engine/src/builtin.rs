//! Ready-made conditions.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use warden_core::Address;

use crate::condition::{ConditionRequest, PermissionCondition};

/// Length of a call selector prefix in `data`.
pub const SELECTOR_LEN: usize = 4;

/// Grants only to actors on a fixed list.
///
/// Useful behind a wildcard-actor grant: `(resource, ANY, id)` conditional
/// on an allowlist behaves like one grant per listed actor.
#[derive(Debug, Clone, Default)]
pub struct ActorAllowlist {
    actors: HashSet<Address>,
}

impl ActorAllowlist {
    /// Allowlist of `actors`.
    pub fn new(actors: impl IntoIterator<Item = Address>) -> Self {
        Self {
            actors: actors.into_iter().collect(),
        }
    }
}

impl PermissionCondition for ActorAllowlist {
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool {
        self.actors.contains(&request.actor)
    }

    fn name(&self) -> &str {
        "actor_allowlist"
    }
}

/// Grants inside a time window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    /// Earliest instant the grant is valid (inclusive).
    pub not_before: Option<DateTime<Utc>>,
    /// Instant the grant stops being valid (exclusive).
    pub not_after: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Window between two instants.
    #[must_use]
    pub fn between(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Self {
            not_before: Some(not_before),
            not_after: Some(not_after),
        }
    }

    /// Window that closes at `not_after`.
    #[must_use]
    pub fn until(not_after: DateTime<Utc>) -> Self {
        Self {
            not_before: None,
            not_after: Some(not_after),
        }
    }

    /// Whether the window contains `now`.
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.not_before.is_none_or(|start| now >= start)
            && self.not_after.is_none_or(|end| now < end)
    }
}

impl PermissionCondition for TimeWindow {
    fn is_granted(&self, _request: &ConditionRequest<'_>) -> bool {
        self.contains(Utc::now())
    }

    fn name(&self) -> &str {
        "time_window"
    }
}

/// Grants when the call data starts with an allowed 4-byte selector.
///
/// Data shorter than a selector is denied.
#[derive(Debug, Clone, Default)]
pub struct CallSelector {
    selectors: HashSet<[u8; SELECTOR_LEN]>,
}

impl CallSelector {
    /// Allow the given selectors.
    pub fn new(selectors: impl IntoIterator<Item = [u8; SELECTOR_LEN]>) -> Self {
        Self {
            selectors: selectors.into_iter().collect(),
        }
    }

    /// The selector prefix of `data`, if it is long enough.
    #[must_use]
    pub fn selector_of(data: &[u8]) -> Option<[u8; SELECTOR_LEN]> {
        data.get(..SELECTOR_LEN)?.try_into().ok()
    }
}

impl PermissionCondition for CallSelector {
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool {
        Self::selector_of(request.data).is_some_and(|s| self.selectors.contains(&s))
    }

    fn name(&self) -> &str {
        "call_selector"
    }
}

/// A condition backed by a closure.
pub struct FnCondition<F> {
    f: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&ConditionRequest<'_>) -> bool + Send + Sync,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnCondition")
    }
}

impl<F> PermissionCondition for FnCondition<F>
where
    F: Fn(&ConditionRequest<'_>) -> bool + Send + Sync,
{
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool {
        (self.f)(request)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Grants when every inner condition grants. Empty grants.
#[derive(Default, Clone)]
pub struct AllOf {
    conditions: Vec<Arc<dyn PermissionCondition>>,
}

impl AllOf {
    /// Conjunction of `conditions`.
    #[must_use]
    pub fn new(conditions: Vec<Arc<dyn PermissionCondition>>) -> Self {
        Self { conditions }
    }
}

impl PermissionCondition for AllOf {
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool {
        self.conditions.iter().all(|c| c.is_granted(request))
    }

    fn name(&self) -> &str {
        "all_of"
    }
}

/// Grants when any inner condition grants. Empty denies.
#[derive(Default, Clone)]
pub struct AnyOf {
    conditions: Vec<Arc<dyn PermissionCondition>>,
}

impl AnyOf {
    /// Disjunction of `conditions`.
    #[must_use]
    pub fn new(conditions: Vec<Arc<dyn PermissionCondition>>) -> Self {
        Self { conditions }
    }
}

impl PermissionCondition for AnyOf {
    fn is_granted(&self, request: &ConditionRequest<'_>) -> bool {
        self.conditions.iter().any(|c| c.is_granted(request))
    }

    fn name(&self) -> &str {
        "any_of"
    }
}
