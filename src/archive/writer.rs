//! Write messages out as archive directories, and stage attachment files
//! into a parts directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::archive::{info::render_info, INFO_FILE};
use crate::error::{MmsError, Result};
use crate::model::message::MmsMessage;

/// Filenames already carrying the platform's own `PART_<millis>` scheme
/// keep their name when staged; everything else gets the message-dir
/// prefix to stay unique within a flat parts directory.
static PART_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PART_\d{13}").expect("valid regex"));

/// Write one message directory under `archive_root`: the `info` file plus
/// a copy of every attachment under its logical name.
///
/// The message must already carry its checksum (the directory name embeds
/// it).
pub fn write_message(msg: &MmsMessage, archive_root: &Path) -> Result<PathBuf> {
    let msg_dir = archive_root.join(msg.dir_name()?);
    std::fs::create_dir_all(&msg_dir).map_err(|e| MmsError::io(&msg_dir, e))?;

    let info_path = msg_dir.join(INFO_FILE);
    std::fs::write(&info_path, render_info(msg)).map_err(|e| MmsError::io(&info_path, e))?;

    for (name, att) in &msg.attachments {
        copy_if_absent(&att.local_path, &msg_dir.join(name))?;
    }

    debug!(dir = %msg_dir.display(), "Wrote message directory");
    Ok(msg_dir)
}

/// Stage a message's attachment files into a flat parts directory,
/// updating each attachment's local path to the staged copy.
///
/// Returns the number of files copied. An existing destination is
/// accepted only when its bytes already match the source; anything else
/// is a divergent duplicate and fails the run.
pub fn stage_attachments(msg: &mut MmsMessage, parts_dir: &Path) -> Result<usize> {
    if !parts_dir.is_dir() {
        return Err(MmsError::DirNotFound(parts_dir.to_path_buf()));
    }
    let prefix = msg.dir_name()?;

    let mut copied = 0;
    for (name, att) in msg.attachments.iter_mut() {
        let dest_name = if PART_NAME.is_match(name) {
            name.clone()
        } else {
            format!("{prefix}_{name}")
        };
        let dest = parts_dir.join(&dest_name);
        copy_if_absent(&att.local_path, &dest)?;
        att.local_path = dest;
        copied += 1;
    }

    info!(
        message = %msg.identity(),
        copied,
        dir = %parts_dir.display(),
        "Staged attachments"
    );
    Ok(copied)
}

/// Copy `src` to `dest` unless `dest` already holds the same bytes.
fn copy_if_absent(src: &Path, dest: &Path) -> Result<()> {
    if dest.is_file() {
        if !same_contents(src, dest)? {
            return Err(MmsError::DivergentAttachment(dest.to_path_buf()));
        }
        return Ok(());
    }
    std::fs::copy(src, dest).map_err(|e| MmsError::io(src, e))?;
    Ok(())
}

fn same_contents(a: &Path, b: &Path) -> Result<bool> {
    let bytes_a = std::fs::read(a).map_err(|e| MmsError::io(a, e))?;
    let bytes_b = std::fs::read(b).map_err(|e| MmsError::io(b, e))?;
    Ok(bytes_a == bytes_b)
}
