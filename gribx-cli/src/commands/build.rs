use crate::error::{CliError, CliResult};
use crate::records::{file_inventory, read_records};
use gribx_core::CancelToken;
use gribx_index::{update_needed, CollectionBuilder, IndexConfig};
use std::path::Path;

pub struct BuildOpts<'a> {
    pub name: Option<&'a str>,
    pub top_dir: &'a Path,
    pub nested_time: bool,
    pub cancel: &'a CancelToken,
}

pub fn run(
    records: &Path,
    output: &Path,
    opts: &BuildOpts<'_>,
    config: &IndexConfig,
) -> CliResult<()> {
    let lines = read_records(records)?;
    if lines.is_empty() {
        return Err(CliError::Input(format!("{} has no records", records.display())));
    }
    let (files, numbers) = file_inventory(&lines, opts.top_dir)?;

    let path = config.resolve_index_path(output);
    if !update_needed(config.update, &path, &files, config)? {
        println!("Index {} is up to date", path.display());
        return Ok(());
    }

    let name = super::collection_name(opts.name, output);
    let record_count = lines.len();
    let mut builder = CollectionBuilder::new(
        name.as_str(),
        opts.top_dir.to_string_lossy(),
        files,
    )
    .with_cancel(opts.cancel.clone(), config);
    for line in lines {
        if !builder.has_group(&line.group) {
            builder.add_group(line.group.clone(), line.axes(opts.nested_time))?;
        }
        let file_no = numbers.get(&line.file).copied().ok_or_else(|| {
            CliError::Input(format!("file '{}' missing from inventory", line.file))
        })?;
        let group = line.group.clone();
        builder.add_record(&group, line.into_record(file_no))?;
    }

    let index = builder.build()?;
    let written = index.write(output, config)?;
    println!(
        "Built index '{}': {} records, {} groups, {} files -> {}",
        name,
        record_count,
        index.groups.len(),
        index.files.len(),
        written.display()
    );
    Ok(())
}
