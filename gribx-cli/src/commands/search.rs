use crate::error::{CliError, CliResult};
use gribx_core::SearchMode;
use gribx_index::{CollectionIndex, IndexConfig};
use std::path::Path;

pub struct SearchOpts {
    pub axis: usize,
    pub target: f64,
    pub to: Option<f64>,
    pub mode: SearchMode,
    pub bounded: bool,
}

/// Prints one `index<TAB>value` line per matched axis position.
pub fn run(
    index_path: &Path,
    group: &str,
    opts: &SearchOpts,
    config: &IndexConfig,
) -> CliResult<()> {
    let index = CollectionIndex::read(index_path, config)?;
    let coord = index.axis(group, opts.axis)?;
    let search = coord.search();

    let hits = match opts.to {
        Some(hi) => search.find_range(opts.target, hi, opts.bounded)?,
        None => search
            .find_index(opts.target, opts.mode, opts.bounded)?
            .map(|i| i..=i),
    };
    let hits = hits.ok_or_else(|| {
        CliError::NotFound(format!(
            "{} is outside the {} axis of group '{group}'",
            match opts.to {
                Some(hi) => format!("[{}, {hi}]", opts.target),
                None => opts.target.to_string(),
            },
            coord.coord_type()
        ))
    })?;

    for i in hits {
        if let Some(value) = coord.value(i) {
            println!("{i}\t{value}");
        }
    }
    Ok(())
}
