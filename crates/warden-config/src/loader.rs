//! Locating, reading and layering config files.
//!
//! Layers, lowest precedence first: the embedded `defaults.toml`,
//! `/etc/warden/config.toml`, the per-user `config.toml`, then an explicit
//! file if one was named. Later layers override earlier ones key by key.
//! `WARDEN_*` variables fill only fields no file set. The merged tree is
//! deserialized into [`Config`] and validated.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use toml::Value;
use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Files above this many bytes are refused.
const SIZE_LIMIT: u64 = 1 << 20;

const SYSTEM_CONFIG_PATH: &str = "/etc/warden/config.toml";

/// A validated [`Config`] together with its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Files that contributed, lowest precedence first.
    pub loaded_files: Vec<String>,
    /// How many `WARDEN_*` fallbacks filled a field.
    pub env_applied: usize,
}

/// The merged TOML tree while layers are being applied.
struct Layers {
    tree: Value,
    set_by_files: HashSet<String>,
    sources: Vec<String>,
}

impl Layers {
    fn from_defaults() -> ConfigResult<Self> {
        let tree = toml::from_str(DEFAULTS_TOML).map_err(|source| ConfigError::Parse {
            origin: "embedded defaults".to_owned(),
            source,
        })?;
        Ok(Self {
            tree,
            set_by_files: HashSet::new(),
            sources: Vec::new(),
        })
    }

    fn push(&mut self, path: &Path, layer: &Value) {
        merge_value(&mut self.tree, layer, &mut Vec::new(), &mut self.set_by_files);
        self.sources.push(path.display().to_string());
        info!(path = %path.display(), "config layer applied");
    }

    fn finish(self, origin: &str, env_applied: usize) -> ConfigResult<ResolvedConfig> {
        let config: Config = self
            .tree
            .try_into()
            .map_err(|source| ConfigError::Parse {
                origin: origin.to_owned(),
                source,
            })?;
        validate::validate(&config)?;
        Ok(ResolvedConfig {
            config,
            loaded_files: self.sources,
            env_applied,
        })
    }
}

/// Resolve the full layered configuration.
///
/// With `home_override`, `{home}/config.toml` replaces the platform user
/// config location.
///
/// # Errors
///
/// Any [`ConfigError`]: a malformed or oversized layer, a missing
/// `explicit` file, a bad environment value, or a failed validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let user = home_override.map_or_else(user_config_path, |home| Some(home.join("config.toml")));
    load_layers(
        Some(Path::new(SYSTEM_CONFIG_PATH)),
        user.as_deref(),
        explicit,
        &collect_env_vars(),
    )
}

pub(crate) fn load_layers(
    system_path: Option<&Path>,
    user_path: Option<&Path>,
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut layers = Layers::from_defaults()?;

    for path in [system_path, user_path].into_iter().flatten() {
        match read_optional(path)? {
            Some(layer) => layers.push(path, &layer),
            None => debug!(path = %path.display(), "no config layer here"),
        }
    }
    if let Some(path) = explicit {
        let layer = read_required(path)?;
        layers.push(path, &layer);
    }

    let env_applied = apply_env_fallbacks(&mut layers.tree, &layers.set_by_files, env_vars)?;
    if env_applied > 0 {
        debug!(env_applied, "environment fallbacks applied");
    }
    layers.finish("<merged config>", env_applied)
}

/// Defaults overlaid with exactly one file; no system, user or env layers.
///
/// # Errors
///
/// [`ConfigError`] if the file is unreadable, malformed, or invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let mut layers = Layers::from_defaults()?;
    layers.push(path, &read_required(path)?);
    layers
        .finish(&path.display().to_string(), 0)
        .map(|resolved| resolved.config)
}

/// Overlay `layer` onto `base`: tables merge key by key, any other value
/// replaces what was there. Every leaf path the layer touched is recorded
/// in `touched` as a dotted key.
fn merge_value(
    base: &mut Value,
    layer: &Value,
    at: &mut Vec<String>,
    touched: &mut HashSet<String>,
) {
    match (base, layer) {
        (Value::Table(into), Value::Table(from)) => {
            for (key, value) in from {
                at.push(key.clone());
                match into.get_mut(key) {
                    Some(existing) => merge_value(existing, value, at, touched),
                    None => {
                        into.insert(key.clone(), value.clone());
                        collect_leaves(value, at, touched);
                    },
                }
                at.pop();
            }
        },
        (slot, replacement) => {
            *slot = replacement.clone();
            touched.insert(at.join("."));
        },
    }
}

fn collect_leaves(value: &Value, at: &mut Vec<String>, touched: &mut HashSet<String>) {
    let Value::Table(table) = value else {
        touched.insert(at.join("."));
        return;
    };
    for (key, child) in table {
        at.push(key.clone());
        collect_leaves(child, at, touched);
        at.pop();
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "warden")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn read_required(path: &Path) -> ConfigResult<Value> {
    read_optional(path)?.ok_or_else(|| ConfigError::Read {
        path: path.to_path_buf(),
        source: ErrorKind::NotFound.into(),
    })
}

/// `Ok(None)` when the file is absent. The file is read once with no
/// prior existence check.
fn read_optional(path: &Path) -> ConfigResult<Option<Value>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        },
    };

    let size = u64::try_from(text.len()).unwrap_or(u64::MAX);
    if size > SIZE_LIMIT {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: SIZE_LIMIT,
        });
    }
    toml::from_str(&text)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })
}
