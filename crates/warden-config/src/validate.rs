//! Post-merge configuration validation.
//!
//! Checks that deserialized [`Config`](crate::Config) values are well formed
//! and that cross-field invariants hold. Addresses are only checked for
//! shape here; the engine parses them.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, StorageBackend};

/// Hex digits in a 20-byte address.
const ADDRESS_HEX_DIGITS: usize = 40;

/// Upper bound on the event channel capacity.
const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_engine(config)?;
    validate_storage(config)?;
    validate_events(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        message: message.into(),
    }
}

/// Whether `s` looks like a hex-encoded 20-byte address (`0x` optional).
#[must_use]
pub fn is_address_like(s: &str) -> bool {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    digits.len() == ADDRESS_HEX_DIGITS && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

fn validate_engine(config: &Config) -> ConfigResult<()> {
    let e = &config.engine;

    if !is_address_like(&e.identity) {
        return Err(invalid(
            "engine.identity",
            format!("'{}' is not a 20-byte hex address", e.identity),
        ));
    }

    if let Some(holder) = &e.initial_root_holder
        && !is_address_like(holder)
    {
        return Err(invalid(
            "engine.initial_root_holder",
            format!("'{holder}' is not a 20-byte hex address"),
        ));
    }

    if e
        .restricted_wildcard_permissions
        .iter()
        .any(|p| p.trim().is_empty())
    {
        return Err(invalid(
            "engine.restricted_wildcard_permissions",
            "permission names must not be empty",
        ));
    }

    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    let s = &config.storage;
    if s.backend == StorageBackend::SurrealKv && s.path.is_none() {
        return Err(invalid(
            "storage.path",
            "a path is required for the surrealkv backend",
        ));
    }
    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    let cap = config.events.channel_capacity;
    if cap == 0 || cap > MAX_CHANNEL_CAPACITY {
        return Err(invalid(
            "events.channel_capacity",
            format!("channel_capacity must be between 1 and {MAX_CHANNEL_CAPACITY}"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: error, warn, info, debug, trace",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    Ok(())
}
