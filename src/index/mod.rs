//! Content-addressed index of a target directory tree.
//!
//! Maps content-hash → logical-name → absolute path, so an attachment can
//! be matched to its authoritative file even when the surrounding
//! directory layout and generated filename prefixes have changed.

pub mod builder;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Counters collected while building a [`ContentIndex`].
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct IndexStats {
    /// Regular files hashed into the index.
    pub files: u64,
    /// Total bytes hashed.
    pub bytes: u64,
    /// (hash, name) pairs that mapped to more than one path.
    pub ambiguous: u64,
}

/// Two-level lookup structure over a directory tree.
///
/// Entries sharing a hash but differing in normalized name are distinct
/// files that happen to have equal content; they are kept side by side.
/// Entries sharing both hash and name are the ambiguity the collision
/// policy resolves (see [`builder`]).
#[derive(Debug, Default)]
pub struct ContentIndex {
    pub(crate) by_hash: HashMap<String, BTreeMap<String, PathBuf>>,
    pub(crate) stats: IndexStats,
}

impl ContentIndex {
    /// Look up the authoritative path for an attachment by its content
    /// hash and logical name.
    pub fn lookup(&self, content_hash: &str, logical_name: &str) -> Option<&Path> {
        self.by_hash
            .get(content_hash)?
            .get(logical_name)
            .map(PathBuf::as_path)
    }

    /// Number of distinct content hashes present.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Build-time counters.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Iterate every (hash, logical name, path) entry.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Path)> {
        self.by_hash.iter().flat_map(|(hash, by_name)| {
            by_name
                .iter()
                .map(move |(name, path)| (hash.as_str(), name.as_str(), path.as_path()))
        })
    }
}
