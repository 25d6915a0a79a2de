use crate::error::Result;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// One source data file of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MFile {
    /// Path relative to the collection's top directory, `/`-separated.
    pub path: String,
    /// Modification time, epoch milliseconds.
    pub last_modified: i64,
    /// Size in bytes.
    pub length: u64,
    /// Position in the collection's file inventory.
    pub index: u32,
}

impl MFile {
    pub fn new(path: impl Into<String>, last_modified: i64, length: u64, index: u32) -> Self {
        Self {
            path: path.into(),
            last_modified,
            length,
            index,
        }
    }

    /// Stat `top_dir/path` on disk.
    pub fn from_disk(top_dir: &Path, path: &str, index: u32) -> Result<Self> {
        let meta = std::fs::metadata(top_dir.join(path))?;
        Ok(Self {
            path: path.replace('\\', "/"),
            last_modified: modified_millis(&meta),
            length: meta.len(),
            index,
        })
    }
}

/// Modification time of `meta` in epoch milliseconds (0 when unavailable).
pub fn modified_millis(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
