//! Error types for Tessera

use thiserror::Error;

/// Core Tessera errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TesseraError {
    /// A mode name or mode value that is not one of the recognized modes
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for Tessera operations
pub type TesseraResult<T> = Result<T, TesseraError>;
