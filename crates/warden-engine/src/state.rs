//! The engine's complete mutable state.

use crate::freeze::FreezeRegistry;
use crate::store::PermissionStore;

/// Grants, freezes and the initialization flag.
///
/// Cloning is O(1). The engine publishes one `Arc<EngineState>` at a time;
/// readers evaluate against the snapshot they cloned, writers stage a clone
/// and swap it in after commit.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    /// Grant table.
    pub store: PermissionStore,
    /// Freeze table.
    pub freezes: FreezeRegistry,
    /// Whether `initialize` has run.
    pub initialized: bool,
}
