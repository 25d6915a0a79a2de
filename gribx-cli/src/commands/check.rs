use crate::error::{CliError, CliResult};
use crate::records::{file_inventory, read_records};
use gribx_index::{read_index_file, update_needed, IndexConfig, IndexError, MFile};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Succeeds when the index is current; a stale index is reported through
/// [`CliError::Stale`].
pub fn run(
    index_path: &Path,
    records: Option<&Path>,
    top_dir: Option<&Path>,
    config: &IndexConfig,
) -> CliResult<()> {
    let path = config.resolve_index_path(index_path);
    let files = match records {
        Some(records) => {
            let lines = read_records(records)?;
            file_inventory(&lines, top_dir.unwrap_or(Path::new(".")))?.0
        }
        None => indexed_files_on_disk(&path, top_dir, config)?,
    };

    if update_needed(config.update, &path, &files, config)? {
        return Err(CliError::Stale(format!(
            "{} must be rebuilt (update policy '{}')",
            path.display(),
            config.update
        )));
    }
    println!("Index {} is up to date", path.display());
    Ok(())
}

/// Re-stat the files an index was built from. Files that no longer exist are
/// left out; a missing or unreadable index yields an empty inventory.
fn indexed_files_on_disk(
    path: &Path,
    top_dir: Option<&Path>,
    config: &IndexConfig,
) -> CliResult<Vec<MFile>> {
    let raw = match read_index_file(path, config) {
        Ok(raw) => raw,
        Err(IndexError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) if e.is_corrupt() => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let top = top_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&raw.metadata.top_dir));

    let mut files = Vec::with_capacity(raw.metadata.files.len());
    for file in &raw.metadata.files {
        match MFile::from_disk(&top, &file.path, files.len() as u32) {
            Ok(current) => files.push(current),
            Err(IndexError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %file.path, "indexed file no longer exists");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(files)
}
