//! Index configuration

use crate::error::{IndexError, Result};
use crate::format::DEFAULT_MAX_METADATA_BYTES;
use crate::update::CollectionUpdateType;
use gribx_core::DEFAULT_CHECK_EVERY;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for index building and reading
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Root directory for index files given as relative paths.
    ///
    /// If `None`, relative index paths resolve against the working directory.
    pub cache_dir: Option<PathBuf>,

    /// Largest metadata message a reader accepts (and a writer produces).
    ///
    /// Default: 100 MB
    pub max_metadata_bytes: u64,

    /// Records between cancellation checks during a build.
    ///
    /// Default: 4096
    pub cancel_check_every: usize,

    /// When an existing index must be rebuilt.
    ///
    /// Default: `test`
    pub update: CollectionUpdateType,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_metadata_bytes: DEFAULT_MAX_METADATA_BYTES,
            cancel_check_every: DEFAULT_CHECK_EVERY,
            update: CollectionUpdateType::Test,
        }
    }
}

impl IndexConfig {
    /// Builder method to set the cache directory for index files
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Builder method to set the metadata size limit
    pub fn with_max_metadata_bytes(mut self, bytes: u64) -> Self {
        self.max_metadata_bytes = bytes;
        self
    }

    /// Builder method to set the cancellation check interval
    pub fn with_cancel_check_every(mut self, records: usize) -> Self {
        self.cancel_check_every = records;
        self
    }

    /// Builder method to set the update policy
    pub fn with_update(mut self, update: CollectionUpdateType) -> Self {
        self.update = update;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_metadata_bytes == 0 {
            return Err(IndexError::invalid_config("max-metadata-bytes must be > 0"));
        }
        if self.cancel_check_every == 0 {
            return Err(IndexError::invalid_config("cancel-check-every must be > 0"));
        }
        Ok(())
    }

    /// Where an index file named `path` lives: relative paths go under
    /// `cache_dir` when one is set.
    pub fn resolve_index_path(&self, path: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.max_metadata_bytes, 100_000_000);
        assert_eq!(config.cancel_check_every, 4096);
        assert_eq!(config.update, CollectionUpdateType::Test);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders_and_resolve() {
        let config = IndexConfig::default()
            .with_cache_dir("/cache")
            .with_max_metadata_bytes(10)
            .with_update(CollectionUpdateType::Never);
        assert_eq!(config.max_metadata_bytes, 10);
        assert_eq!(
            config.resolve_index_path(Path::new("gfs.ncx")),
            PathBuf::from("/cache/gfs.ncx")
        );
        assert_eq!(
            config.resolve_index_path(Path::new("/abs/gfs.ncx")),
            PathBuf::from("/abs/gfs.ncx")
        );
    }

    #[test]
    fn test_zero_interval_invalid() {
        let config = IndexConfig::default().with_cancel_check_every(0);
        assert!(matches!(
            config.validate(),
            Err(IndexError::InvalidConfig(_))
        ));
    }
}
