//! Directory-rename recovery.
//!
//! Between export passes the database renumbers its internal record ids,
//! so a raw part path like `msg-<ts>-<id>/...` can point at a directory
//! that no longer exists under that id. The file content is usually still
//! present under a sibling directory carrying the same stale id with a
//! different embedded timestamp. This resolver finds it by picking the
//! candidate whose timestamp sits closest to the message's own.
//!
//! Closest-match is a heuristic, not a guarantee: a false negative fails
//! loudly downstream, while a false positive would silently attach the
//! wrong file. Candidates are never invented; only directories embedding
//! the exact stale id qualify.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{MmsError, Result};
use crate::normalize;

static MSG_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^msg-(\d+)-(\d+)$").expect("valid regex"));

/// Locate a file for `logical_name` under a `msg-<ts>-<stale_id>`
/// directory of `root`, choosing the candidate whose embedded timestamp
/// is closest to `expected_millis`.
///
/// Returns `None` when no directory embeds the stale id or none of them
/// contains a file with the logical name. Ties on timestamp distance
/// resolve to the lexicographically smallest directory, so the outcome
/// does not depend on filesystem enumeration order.
pub fn resolve(
    root: &Path,
    stale_id: u64,
    logical_name: &str,
    expected_millis: i64,
) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<(i64, PathBuf, PathBuf)> = Vec::new();

    let entries = std::fs::read_dir(root).map_err(|e| MmsError::io(root, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| MmsError::io(root, e))?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let dir_name = entry.file_name();
        let dir_name = dir_name.to_string_lossy();
        let Some(caps) = MSG_DIR.captures(&dir_name) else {
            continue;
        };
        let Ok(embedded_ts) = caps[1].parse::<i64>() else {
            continue;
        };
        let Ok(embedded_id) = caps[2].parse::<u64>() else {
            continue;
        };
        if embedded_id != stale_id {
            continue;
        }

        if let Some(file) = find_logical_file(&entry.path(), logical_name)? {
            candidates.push((embedded_ts, entry.path(), file));
        }
    }

    candidates.sort_by(|(ts_a, dir_a, _), (ts_b, dir_b, _)| {
        let dist_a = (ts_a - expected_millis).abs();
        let dist_b = (ts_b - expected_millis).abs();
        dist_a.cmp(&dist_b).then_with(|| dir_a.cmp(dir_b))
    });

    match candidates.into_iter().next() {
        Some((ts, dir, file)) => {
            debug!(
                dir = %dir.display(),
                embedded_ts = ts,
                expected = expected_millis,
                "Recovered attachment via stale-id directory"
            );
            Ok(Some(file))
        }
        None => Ok(None),
    }
}

/// First file in `dir` whose normalized name equals `logical_name`.
fn find_logical_file(dir: &Path, logical_name: &str) -> Result<Option<PathBuf>> {
    let mut matches: Vec<PathBuf> = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| MmsError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| MmsError::io(dir, e))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if normalize::strip_generated_prefix(&file_name) == logical_name {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}
