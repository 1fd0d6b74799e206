//! Load messages from a directory archive.

use std::path::Path;

use tracing::{debug, info};

use crate::archive::{info::parse_info, INFO_FILE};
use crate::error::{MmsError, Result};
use crate::model::message::MmsMessage;

/// Read every message directory under `archive_root`.
///
/// Directories are visited in sorted name order so the returned sequence
/// is deterministic. Each must contain an `info` file; a directory
/// without one fails the read rather than being skipped, since a
/// half-written message is exactly the corruption the checksum layer
/// exists to catch.
pub fn read_archive(archive_root: &Path) -> Result<Vec<MmsMessage>> {
    if !archive_root.is_dir() {
        return Err(MmsError::DirNotFound(archive_root.to_path_buf()));
    }

    let mut msg_dirs = Vec::new();
    let entries =
        std::fs::read_dir(archive_root).map_err(|e| MmsError::io(archive_root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| MmsError::io(archive_root, e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            msg_dirs.push(entry.path());
        }
    }
    msg_dirs.sort();

    let mut messages = Vec::with_capacity(msg_dirs.len());
    for msg_dir in msg_dirs {
        let info_path = msg_dir.join(INFO_FILE);
        if !info_path.is_file() {
            return Err(MmsError::MissingInfoFile(msg_dir));
        }
        let contents =
            std::fs::read_to_string(&info_path).map_err(|e| MmsError::io(&info_path, e))?;
        let msg = parse_info(&info_path, &contents, &msg_dir)?;
        debug!(
            dir = %msg_dir.display(),
            date = %msg.date_formatted(),
            attachments = msg.attachments.len(),
            "Loaded message"
        );
        messages.push(msg);
    }

    info!(
        root = %archive_root.display(),
        count = messages.len(),
        "Read archive"
    );
    Ok(messages)
}
