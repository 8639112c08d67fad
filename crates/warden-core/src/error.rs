//! Parse errors for core identity types.

use thiserror::Error;

/// Errors produced while parsing core identity types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The input is not a valid 20-byte hex address.
    #[error("invalid address '{input}': {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The input is not a valid permission id.
    #[error("invalid permission id '{input}': {reason}")]
    InvalidPermissionId {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for core parsing operations.
pub type CoreResult<T> = Result<T, CoreError>;
