//! Logical attachment-name recovery.
//!
//! Raw part paths observed in exported records take the forms
//! `<numeric-id>/<generated-prefix>_<filename>` or
//! `msg-<ts>-<id>/<generated-prefix>_<filename>`, where the generated
//! prefix encodes a record id, participant numbers, a direction token and
//! a 32-hex digest. Re-exports regenerate both the directory segment and
//! the prefix, so matching works on the stripped human filename only.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MmsError, Result};

static GENERATED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+_([0-9+]+-)*[0-9+]+_(INC|NTF|OUT)_[0-9a-f]{32}_").expect("valid regex")
});

static DIR_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)|msg-(\d+)-(\d+))$").expect("valid regex"));

/// A numeric id (and embedded timestamp, when present) carried by the
/// directory segment of a raw part path. The id refers to the record that
/// owned the attachment when the path was written and may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleRef {
    pub id: u64,
    pub ts_millis: Option<i64>,
}

/// Reduce a raw part path to its logical attachment name.
///
/// Strips one leading directory segment when it matches a generated id
/// form, then strips the generated filename prefix when present. A path
/// separator surviving both steps is a parsing anomaly and fails rather
/// than guessing.
pub fn normalize(raw: &str) -> Result<String> {
    let rest = match raw.split_once('/') {
        Some((first, rest)) if DIR_SEGMENT.is_match(first) => rest,
        _ => raw,
    };

    let name = strip_generated_prefix(rest);
    if name.contains('/') || name.is_empty() {
        return Err(MmsError::MalformedAttachmentPath(raw.to_string()));
    }
    Ok(name.to_string())
}

/// Strip the generated filename prefix, if present.
pub fn strip_generated_prefix(filename: &str) -> &str {
    match GENERATED_PREFIX.find(filename) {
        Some(m) => &filename[m.end()..],
        None => filename,
    }
}

/// Extract the stale numeric id embedded in a raw part path's directory
/// segment, for the recovery resolver. `None` when the path has no
/// recognizable id segment.
pub fn stale_ref(raw: &str) -> Option<StaleRef> {
    let (first, _) = raw.split_once('/')?;
    let caps = DIR_SEGMENT.captures(first)?;
    if let Some(id) = caps.get(1) {
        let id = id.as_str().parse().ok()?;
        return Some(StaleRef {
            id,
            ts_millis: None,
        });
    }
    let ts = caps.get(2)?.as_str().parse().ok()?;
    let id = caps.get(3)?.as_str().parse().ok()?;
    Some(StaleRef {
        id,
        ts_millis: Some(ts),
    })
}
