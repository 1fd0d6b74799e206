//! Centralized error types for mmsarc.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mmsarc library.
#[derive(Error, Debug)]
pub enum MmsError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The archive or target directory does not exist.
    #[error("Directory not found: {0}")]
    DirNotFound(PathBuf),

    /// A message directory is missing its `info` metadata file.
    #[error("Missing 'info' file in message directory: {0}")]
    MissingInfoFile(PathBuf),

    /// A line in an `info` file does not match `key=value`.
    #[error("Malformed info line in '{path}': {line}")]
    MalformedInfoLine { path: PathBuf, line: String },

    /// An `info` file lacks a key the format requires.
    #[error("Missing '{key}' in info file: {path}")]
    MissingInfoKey { path: PathBuf, key: &'static str },

    /// An `info` file carries a direction token other than OUT/INC/NTF.
    #[error("Invalid message direction: {0}")]
    InvalidDirection(String),

    /// A copy destination already exists with different content.
    #[error("Attachment already exists with different content: {0}")]
    DivergentAttachment(PathBuf),

    /// An attachment's byte source cannot be read.
    ///
    /// Fatal: the file moved or was deleted mid-migration, and the digest
    /// cannot be computed without its bytes.
    #[error("Missing attachment file: {0}")]
    MissingAttachment(PathBuf),

    /// Normalization could not reduce a raw part path to a clean
    /// logical name (a path separator survived stripping).
    #[error("Malformed attachment path: {0}")]
    MalformedAttachmentPath(String),

    /// The recomputed message digest disagrees with the stored one.
    #[error("Checksum mismatch for message '{message}': stored {stored}, computed {computed}")]
    ChecksumMismatch {
        message: String,
        stored: String,
        computed: String,
    },

    /// Neither the content index nor the recovery heuristic located a file
    /// for this attachment.
    #[error("Unresolved attachment '{attachment}' for message '{message}'")]
    UnresolvedAttachment { message: String, attachment: String },

    /// A message reached checksum verification without a stored checksum.
    #[error("Message '{0}' has no stored checksum")]
    MissingChecksum(String),
}

/// Convenience alias for `Result<T, MmsError>`.
pub type Result<T> = std::result::Result<T, MmsError>;

impl MmsError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MmsError`
/// when no path context is available (rare — prefer `MmsError::io`).
impl From<std::io::Error> for MmsError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
