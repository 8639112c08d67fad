//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur while decoding hashes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid hash length.
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid hex encoding.
    #[error("invalid hex encoding: {0}")]
    InvalidHexEncoding(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
