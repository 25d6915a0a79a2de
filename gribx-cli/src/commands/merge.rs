use crate::error::CliResult;
use gribx_index::{merge_partitions, CollectionIndex, IndexConfig};
use std::path::{Path, PathBuf};

pub fn run(
    partitions: &[PathBuf],
    output: &Path,
    name: Option<&str>,
    top_dir: Option<&str>,
    config: &IndexConfig,
) -> CliResult<()> {
    let mut parts = Vec::with_capacity(partitions.len());
    for path in partitions {
        let index = CollectionIndex::read(path, config)?;
        let part_name = super::collection_name(None, path);
        parts.push((part_name, index));
    }

    let name = super::collection_name(name, output);
    let top_dir = match (top_dir, parts.first()) {
        (Some(dir), _) => dir.to_string(),
        (None, Some((_, first))) => first.top_dir.clone(),
        (None, None) => String::new(),
    };

    let merged = merge_partitions(&name, &top_dir, &parts)?;
    let written = merged.write(output, config)?;
    println!(
        "Merged {} partitions into '{}': {} groups, {} runtimes -> {}",
        parts.len(),
        name,
        merged.groups.len(),
        merged.run_to_partition.len(),
        written.display()
    );
    Ok(())
}
