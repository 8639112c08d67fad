//! Configuration errors.

use std::path::PathBuf;

/// Why a configuration could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A layer is not valid TOML, or the merged layers do not fit the schema.
    #[error("cannot parse {origin}: {source}")]
    Parse {
        /// File path, or a description of the layer.
        origin: String,
        /// TOML failure.
        #[source]
        source: toml::de::Error,
    },

    /// A config file is over the size cap.
    #[error("{} is {size} bytes; config files are capped at {limit}", path.display())]
    TooLarge {
        /// Offending file.
        path: PathBuf,
        /// Its size.
        size: u64,
        /// The cap.
        limit: u64,
    },

    /// A value parsed but is not acceptable.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Dotted field path, e.g. `engine.identity`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A `WARDEN_*` variable could not be converted to its field's type.
    #[error("{var}: {message}")]
    Env {
        /// Variable name.
        var: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
