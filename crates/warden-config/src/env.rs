//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that
//! no config file set.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// How an env var value is converted into a TOML value.
#[derive(Clone, Copy)]
enum EnvKind {
    String,
    Integer,
    Bool,
    /// Comma-separated list of strings.
    List,
}

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: EnvKind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "WARDEN_ENGINE_IDENTITY",
        field_path: "engine.identity",
        kind: EnvKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_ROOT_HOLDER",
        field_path: "engine.initial_root_holder",
        kind: EnvKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_RESTRICTED_WILDCARD_PERMISSIONS",
        field_path: "engine.restricted_wildcard_permissions",
        kind: EnvKind::List,
    },
    EnvMapping {
        var_name: "WARDEN_STORAGE_BACKEND",
        field_path: "storage.backend",
        kind: EnvKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_STORAGE_PATH",
        field_path: "storage.path",
        kind: EnvKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_EVENTS_ENABLED",
        field_path: "events.enabled",
        kind: EnvKind::Bool,
    },
    EnvMapping {
        var_name: "WARDEN_EVENTS_CAPACITY",
        field_path: "events.channel_capacity",
        kind: EnvKind::Integer,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_LEVEL",
        field_path: "logging.level",
        kind: EnvKind::String,
    },
    EnvMapping {
        var_name: "WARDEN_LOG_FORMAT",
        field_path: "logging.format",
        kind: EnvKind::String,
    },
];

/// Collect the `WARDEN_*` variables from the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("WARDEN_"))
        .collect()
}

/// Apply environment fallbacks to fields that were **not** set by any
/// config file (`file_fields` holds the dotted paths files did set).
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::Env`] if a numeric or boolean variable does
/// not parse.
pub fn apply_env_fallbacks<S: std::hash::BuildHasher>(
    merged: &mut toml::Value,
    file_fields: &HashSet<String>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if file_fields.contains(mapping.field_path) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "config file already sets field, ignoring env var"
            );
            continue;
        }

        let env_err = |message: String| ConfigError::Env {
            var: mapping.var_name.to_owned(),
            message,
        };
        let value = match mapping.kind {
            EnvKind::String => toml::Value::String(raw.clone()),
            EnvKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(toml::Value::Integer)
                .map_err(|e| env_err(format!("expected an integer: {e}")))?,
            EnvKind::Bool => raw
                .trim()
                .parse::<bool>()
                .map(toml::Value::Boolean)
                .map_err(|e| env_err(format!("expected true or false: {e}")))?,
            EnvKind::List => toml::Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| toml::Value::String(s.to_owned()))
                    .collect(),
            ),
        };

        set_path(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Set a dotted path in a TOML tree, creating intermediate tables.
fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut parts = path.split('.').peekable();
    let mut node = root;
    while let Some(part) = parts.next() {
        let toml::Value::Table(table) = node else {
            return;
        };
        if parts.peek().is_none() {
            table.insert(part.to_owned(), value);
            return;
        }
        node = table
            .entry(part.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}
