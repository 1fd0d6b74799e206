//! Content index construction.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{MmsError, Result};
use crate::index::ContentIndex;
use crate::normalize;

const READ_BUF_SIZE: usize = 8192;

/// Version-control metadata directories excluded from the walk.
const VCS_DIRS: [&str; 3] = [".git", ".svn", ".hg"];

/// Build a [`ContentIndex`] over every regular file under `root`.
///
/// Files are enumerated in sorted order and hashed with SHA-256 (the
/// locator hash; the message-level digest stays separate). Filenames are
/// normalized before insertion, so differently-prefixed copies of the
/// same logical attachment land on the same key.
///
/// Collision policy: a (hash, name) pair observed at two distinct paths
/// keeps the lexicographically smallest path. The condition is reported
/// via `warn!` and counted in the stats; it typically means duplicate
/// imports, not corruption.
pub fn build_index(
    root: &Path,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<ContentIndex> {
    if !root.is_dir() {
        return Err(MmsError::DirNotFound(root.to_path_buf()));
    }

    let files = collect_files(root)?;
    let total = files.len() as u64;
    info!(root = %root.display(), files = total, "Building content index");

    let mut index = ContentIndex::default();
    for (i, path) in files.iter().enumerate() {
        if let Some(progress) = progress {
            progress(i as u64, total);
        }

        let (hash, size) = hash_file(path)?;
        let raw_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = normalize::strip_generated_prefix(&raw_name).to_string();

        index.stats.files += 1;
        index.stats.bytes += size;

        let by_name = index.by_hash.entry(hash).or_default();
        match by_name.get_mut(&name) {
            Some(existing) => {
                warn!(
                    name = %name,
                    kept = %existing.display(),
                    dropped = %path.display(),
                    "Ambiguous index entry: same content and name at two paths"
                );
                index.stats.ambiguous += 1;
                if path < existing {
                    *existing = path.clone();
                }
            }
            None => {
                by_name.insert(name, path.clone());
            }
        }
    }
    if let Some(progress) = progress {
        progress(total, total);
    }

    debug!(
        hashes = index.by_hash.len(),
        ambiguous = index.stats.ambiguous,
        "Content index ready"
    );
    Ok(index)
}

/// Enumerate regular files under `root`, sorted, skipping VCS metadata.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.file_type().is_dir() && VCS_DIRS.contains(&name.as_ref()))
    });
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf());
            match e.into_io_error() {
                Some(io) => MmsError::io(&path, io),
                None => MmsError::DirNotFound(path),
            }
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// SHA-256 content hash of a file, streamed. Returns (hex digest, size).
pub fn hash_file(path: &Path) -> Result<(String, u64)> {
    let mut file =
        File::open(path).map_err(|_| MmsError::MissingAttachment(path.to_path_buf()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut size: u64 = 0;
    loop {
        let n = file.read(&mut buf).map_err(|e| MmsError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), size))
}
