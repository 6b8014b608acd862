//! Centralized error types for mobikit.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mobikit library.
#[derive(Error, Debug)]
pub enum MobiError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("E-book file not found: {0}")]
    FileNotFound(PathBuf),

    /// The PDB envelope is truncated or its directory is inconsistent.
    #[error("Malformed PDB container: expected {expected}, found {actual}")]
    MalformedContainer { expected: String, actual: String },

    /// A magic literal did not match (`MOBI` or `EXTH`).
    #[error("Malformed header: expected '{expected}' but found '{actual}'")]
    MalformedHeader { expected: String, actual: String },

    /// An EXTH record declares a length below its own 8-byte prefix,
    /// or runs past the end of record 0.
    #[error("Malformed EXTH record at offset {offset}: declared length {length}")]
    MalformedRecord { offset: usize, length: u32 },

    /// An INDX / TAGX / IDXT structure could not be decoded.
    #[error("Malformed index record: {0}")]
    MalformedIndex(String),

    /// The text uses a compression scheme that is not implemented (HUFF/CDIC)
    /// or an unknown compression code.
    #[error("Unsupported compression code {0}")]
    UnsupportedCompression(u16),

    /// The character encoding is not supported for the requested operation.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Input was rejected before any mutation took place.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias for `Result<T, MobiError>`.
pub type Result<T> = std::result::Result<T, MobiError>;

impl MobiError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a container error where only a length is known to be short.
    pub(crate) fn truncated(what: &str, needed: usize, actual: usize) -> Self {
        Self::MalformedContainer {
            expected: format!("{what} of at least {needed} bytes"),
            actual: format!("{actual} bytes"),
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MobiError`
/// when no path context is available (rare, prefer `MobiError::io`).
impl From<std::io::Error> for MobiError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
