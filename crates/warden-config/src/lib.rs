#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the Warden permission engine.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warden_config::Config;
//!
//! // defaults → /etc/warden → user config dir → env fallbacks
//! let resolved = Config::load(None).unwrap();
//! println!("engine identity: {}", resolved.config.engine.identity);
//! ```
//!
//! # Layers
//!
//! A later entry wins over an earlier one:
//!
//! 1. `defaults.toml`, embedded in the crate
//! 2. `WARDEN_*` environment variables, but only for fields no file sets
//! 3. `/etc/warden/config.toml`
//! 4. `{config_dir}/warden/config.toml`
//! 5. the file passed to [`Config::load`]
//!
//! Addresses stay plain strings here; the engine parses them when it is
//! built from a [`Config`], so this crate has no internal dependencies.

/// `WARDEN_*` fallbacks.
pub mod env;
/// Load and validation errors.
pub mod error;
/// Layered file loading.
pub mod loader;
/// The configuration tree.
pub mod types;
/// Cross-field checks run after loading.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Resolve every layer, with `explicit` on top when given.
    ///
    /// # Errors
    ///
    /// See [`loader::load`].
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// The embedded defaults overlaid with `path` alone.
    ///
    /// # Errors
    ///
    /// See [`loader::load_file`].
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
