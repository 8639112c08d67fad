//! Logging setup errors.

/// Why logging could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A level, directive or format name did not parse.
    #[error("invalid log setting: {0}")]
    Setting(String),

    /// The log writer or the global subscriber could not be installed.
    #[error("cannot install logging: {0}")]
    Install(String),

    /// The log directory could not be prepared.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for logging setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
