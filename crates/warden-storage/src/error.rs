//! Storage errors.

/// Why a store operation failed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend rejected or failed the operation.
    #[error("backend failure: {0}")]
    Backend(String),

    /// The backend could not be opened.
    #[error("cannot open store: {0}")]
    Open(String),

    /// A stored value could not be encoded or decoded.
    #[error("codec failure: {0}")]
    Codec(String),

    /// A namespace or key is empty or contains a null byte.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;
