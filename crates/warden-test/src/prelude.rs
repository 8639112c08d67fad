//! Common test imports.
//!
//! ```rust
//! use warden_test::prelude::*;
//! ```

pub use crate::fixtures::{
    engine_with_root, engine_with_store, init_test_tracing, test_address, test_permission,
};
pub use crate::mocks::{
    AttemptOutcome, FailingKvStore, PanickingCondition, RecordedRequest, RecordingCondition,
    ReentrantCondition,
};
