//! Error types for the Folio library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`FolioError`] enum. A key that is simply absent from a block store is not
//! an error: lookups report it as `Ok(None)`.
//!
//! # Examples
//!
//! ```
//! use folio::error::{FolioError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(FolioError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Folio operations.
#[derive(Error, Debug)]
pub enum FolioError {
    /// I/O errors (open, read, write, seek).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index building or searching errors.
    #[error("Index error: {0}")]
    Index(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed on-disk data: bad framing, header or checksum.
    #[error("Format error: {0}")]
    Format(String),

    /// Internal-consistency violation between the stores of one index.
    #[error("Corrupt index: {0}")]
    Corrupt(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// An error with context attached by the caller, shown with its causes.
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with FolioError.
pub type Result<T> = std::result::Result<T, FolioError>;

impl FolioError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        FolioError::Index(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        FolioError::Analysis(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        FolioError::Storage(msg.into())
    }

    /// Create a new format error.
    pub fn format<S: Into<String>>(msg: S) -> Self {
        FolioError::Format(msg.into())
    }

    /// Create a new corruption error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        FolioError::Corrupt(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        FolioError::Other(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FolioError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Returns true if the error stems from unreadable or inconsistent index data.
    pub fn is_corruption(&self) -> bool {
        matches!(self, FolioError::Format(_) | FolioError::Corrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = FolioError::index("Test index error");
        assert_eq!(error.to_string(), "Index error: Test index error");

        let error = FolioError::format("bad header");
        assert_eq!(error.to_string(), "Format error: bad header");

        let error = FolioError::corrupt("missing document");
        assert_eq!(error.to_string(), "Corrupt index: missing document");
        assert!(error.is_corruption());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let folio_error = FolioError::from(io_error);

        match folio_error {
            FolioError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
        assert!(!FolioError::storage("x").is_corruption());
    }

    #[test]
    fn test_context_error_shows_cause() {
        let error: FolioError = anyhow::anyhow!("short read")
            .context("cannot open store data.store")
            .into();
        assert_eq!(error.to_string(), "cannot open store data.store: short read");
    }
}
