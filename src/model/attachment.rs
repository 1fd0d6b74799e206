//! Attachment metadata.
//!
//! The attachment content itself is never held in memory. Only paths are
//! stored; bytes are streamed from disk when a digest or copy needs them.

use std::path::PathBuf;

/// A single logical attachment of a message.
///
/// The logical name is the human filename after stripping any generated
/// identifier prefix, and is unique within its message. Two raw paths
/// that normalize to the same logical name refer to the same attachment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Logical (normalized) attachment name, e.g. `photo.jpg`.
    pub name: String,

    /// Raw relative path as observed in the source record, possibly
    /// containing a stale numeric directory segment and a generated prefix.
    pub raw_path: String,

    /// Local file the attachment bytes are currently read from.
    pub local_path: PathBuf,

    /// Canonical path on the target device. `None` until reconciliation
    /// binds the attachment to an authoritative file.
    pub remote_path: Option<PathBuf>,
}

impl Attachment {
    /// Create an attachment whose raw path and local file are already known.
    pub fn new(name: impl Into<String>, raw_path: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            raw_path: raw_path.into(),
            local_path,
            remote_path: None,
        }
    }
}
