use crate::error::{CliError, CliResult};
use gribx_index::{CollectionUpdateType, IndexConfig};
use serde::Deserialize;
use std::path::Path;

const CONFIG_FILE: &str = "gribx.toml";

/// On-disk layout of `gribx.toml`:
///
/// ```toml
/// [index]
/// cache-dir = "indexes"
/// max-metadata-bytes = 100000000
/// cancel-check-every = 4096
/// update = "test"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    index: IndexConfig,
}

/// Parse config text. A relative `cache-dir` is taken relative to `base`.
pub fn parse_config(text: &str, base: Option<&Path>) -> CliResult<IndexConfig> {
    let file: ConfigFile = toml::from_str(text)?;
    let mut config = file.index;
    if let (Some(dir), Some(base)) = (&config.cache_dir, base) {
        if dir.is_relative() {
            config.cache_dir = Some(base.join(dir));
        }
    }
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

/// Load `--config`, or `./gribx.toml` when present, or defaults.
pub fn load_config(config_override: Option<&Path>) -> CliResult<IndexConfig> {
    let path = match config_override {
        Some(p) if p.is_file() => p.to_path_buf(),
        Some(p) => {
            return Err(CliError::Config(format!(
                "config file does not exist: {}",
                p.display()
            )))
        }
        None => {
            let local = std::env::current_dir()?.join(CONFIG_FILE);
            if !local.is_file() {
                return Ok(IndexConfig::default());
            }
            local
        }
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| CliError::Config(format!("failed to read {}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "loading config");
    parse_config(&text, path.parent())
}

/// Apply a `--update` override.
pub fn with_update(config: IndexConfig, update: Option<&str>) -> CliResult<IndexConfig> {
    match update {
        Some(u) => {
            let update: CollectionUpdateType = u.parse().map_err(|_| {
                CliError::Usage(format!(
                    "invalid --update '{u}' (expected always, never, nocheck, test or testIndexOnly)"
                ))
            })?;
            Ok(config.with_update(update))
        }
        None => Ok(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("", None).unwrap(), IndexConfig::default());
    }

    #[test]
    fn test_index_section() {
        let config = parse_config(
            "[index]\ncache-dir = \"idx\"\nmax-metadata-bytes = 1000\nupdate = \"testIndexOnly\"\n",
            Some(Path::new("/etc/gribx")),
        )
        .unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/etc/gribx/idx")));
        assert_eq!(config.max_metadata_bytes, 1000);
        assert_eq!(config.update, CollectionUpdateType::TestIndexOnly);
    }

    #[test]
    fn test_rejects_unknown_and_invalid() {
        assert!(matches!(
            parse_config("[storage]\npath = \"x\"\n", None),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            parse_config("[index]\ncancel-check-every = 0\n", None),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_update_override() {
        let config = with_update(IndexConfig::default(), Some("always")).unwrap();
        assert_eq!(config.update, CollectionUpdateType::Always);
        assert!(matches!(
            with_update(IndexConfig::default(), Some("weekly")),
            Err(CliError::Usage(_))
        ));
    }
}
