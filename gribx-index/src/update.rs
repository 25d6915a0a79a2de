//! Decide whether an existing index file must be rebuilt.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::mfile::{modified_millis, MFile};
use crate::reader::read_index_file;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Rebuild policy for an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum CollectionUpdateType {
    /// Always rebuild.
    #[serde(rename = "always")]
    Always,
    /// Never rebuild, even if the index is missing.
    #[serde(rename = "never")]
    Never,
    /// Rebuild only when the index is missing.
    #[serde(rename = "nocheck")]
    NoCheck,
    /// Rebuild when a file is newer than the index or the inventory changed.
    #[serde(rename = "test")]
    Test,
    /// Rebuild when a file is newer than the index.
    #[serde(rename = "testIndexOnly")]
    TestIndexOnly,
}

impl CollectionUpdateType {
    pub fn name(self) -> &'static str {
        match self {
            CollectionUpdateType::Always => "always",
            CollectionUpdateType::Never => "never",
            CollectionUpdateType::NoCheck => "nocheck",
            CollectionUpdateType::Test => "test",
            CollectionUpdateType::TestIndexOnly => "testIndexOnly",
        }
    }
}

impl fmt::Display for CollectionUpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CollectionUpdateType {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(CollectionUpdateType::Always),
            "never" => Ok(CollectionUpdateType::Never),
            "nocheck" => Ok(CollectionUpdateType::NoCheck),
            "test" => Ok(CollectionUpdateType::Test),
            "testindexonly" => Ok(CollectionUpdateType::TestIndexOnly),
            other => Err(IndexError::invalid_config(format!(
                "unknown update type '{other}'"
            ))),
        }
    }
}

/// Whether the index at `index_path` must be rebuilt for the current file
/// inventory `files`.
///
/// An index that exists but cannot be read always needs a rebuild.
pub fn update_needed(
    update: CollectionUpdateType,
    index_path: &Path,
    files: &[MFile],
    config: &IndexConfig,
) -> Result<bool> {
    match update {
        CollectionUpdateType::Never => return Ok(false),
        CollectionUpdateType::Always => return Ok(true),
        _ => {}
    }

    let index_meta = match std::fs::metadata(index_path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %index_path.display(), "index missing");
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };
    if update == CollectionUpdateType::NoCheck {
        return Ok(false);
    }

    let index_modified = modified_millis(&index_meta);
    if let Some(newer) = files.iter().find(|f| f.last_modified > index_modified) {
        debug!(file = %newer.path, "file newer than index");
        return Ok(true);
    }
    if update == CollectionUpdateType::TestIndexOnly {
        return Ok(false);
    }

    let old = match read_index_file(index_path, config) {
        Ok(raw) => raw.metadata.files,
        Err(IndexError::CorruptIndex(msg)) => {
            warn!(path = %index_path.display(), error = %msg, "unreadable index, rebuilding");
            return Ok(true);
        }
        Err(e) => return Err(e),
    };

    let current: FxHashSet<&str> = files.iter().map(|f| f.path.as_str()).collect();
    let previous: FxHashSet<&str> = old.iter().map(|f| f.path.as_str()).collect();
    if let Some(deleted) = previous.difference(&current).next() {
        debug!(file = %deleted, "file removed since index was built");
        return Ok(true);
    }
    if let Some(added) = current.difference(&previous).next() {
        debug!(file = %added, "file added since index was built");
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_type() {
        assert_eq!(
            "testIndexOnly".parse::<CollectionUpdateType>().unwrap(),
            CollectionUpdateType::TestIndexOnly
        );
        assert_eq!(
            "NOCHECK".parse::<CollectionUpdateType>().unwrap(),
            CollectionUpdateType::NoCheck
        );
        assert!("sometimes".parse::<CollectionUpdateType>().is_err());
    }

    #[test]
    fn test_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.ncx");
        let config = IndexConfig::default();
        assert!(update_needed(CollectionUpdateType::Test, &path, &[], &config).unwrap());
        assert!(update_needed(CollectionUpdateType::NoCheck, &path, &[], &config).unwrap());
        assert!(!update_needed(CollectionUpdateType::Never, &path, &[], &config).unwrap());
    }

    #[test]
    fn test_garbage_index_needs_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.ncx");
        std::fs::write(&path, b"not an index").unwrap();
        let config = IndexConfig::default();
        assert!(!update_needed(CollectionUpdateType::NoCheck, &path, &[], &config).unwrap());
        assert!(!update_needed(CollectionUpdateType::TestIndexOnly, &path, &[], &config).unwrap());
        assert!(update_needed(CollectionUpdateType::Test, &path, &[], &config).unwrap());
    }
}
