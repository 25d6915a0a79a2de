pub mod build;
pub mod check;
pub mod find;
pub mod inspect;
pub mod merge;
pub mod search;

use std::path::Path;

/// `--name`, or the output file stem.
pub(crate) fn collection_name(name: Option<&str>, output: &Path) -> String {
    match name {
        Some(n) => n.to_string(),
        None => output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "collection".to_string()),
    }
}
