use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Address used for the engine identity when nothing else is configured.
pub const DEFAULT_ENGINE_IDENTITY: &str = "0x0000000000000000000000000000000000000001";

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Engine identity and grant policy.
    pub engine: EngineConfig,
    /// Backing store for the permission tables.
    pub storage: StorageConfig,
    /// Change notifications.
    pub events: EventsConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Hex address of the engine itself.
    pub identity: String,
    /// Hex address that receives the initial ROOT grant. Leave unset to
    /// initialize the engine explicitly.
    pub initial_root_holder: Option<String>,
    /// Permission names (or `0x` ids) that may never be granted to the
    /// wildcard actor or resource.
    pub restricted_wildcard_permissions: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity: DEFAULT_ENGINE_IDENTITY.to_owned(),
            initial_root_holder: None,
            restricted_wildcard_permissions: Vec::new(),
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Keep permission tables in memory only.
    #[default]
    Memory,
    /// Persist permission tables in an embedded `SurrealKV` store.
    SurrealKv,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Which backend to use.
    pub backend: StorageBackend,
    /// Directory for persistent backends.
    pub path: Option<PathBuf>,
}

/// `[events]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    /// Whether the engine publishes change notifications.
    pub enabled: bool,
    /// Broadcast channel capacity per receiver.
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra `tracing` directives, e.g. `warden_engine=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}
