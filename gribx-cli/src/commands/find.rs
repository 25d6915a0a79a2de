use crate::error::{CliError, CliResult};
use gribx_index::{CollectionIndex, IndexConfig};
use std::path::Path;

pub fn run(
    index_path: &Path,
    group: &str,
    values: &[String],
    config: &IndexConfig,
) -> CliResult<()> {
    let index = CollectionIndex::read(index_path, config)?;
    let g = index.group(group)?;
    let coords = index.group_coordinates(g);
    if values.len() != coords.len() {
        let types: Vec<&str> = coords.iter().map(|c| c.coord_type().name()).collect();
        return Err(CliError::Usage(format!(
            "group '{group}' has {} axes ({}), got {} values",
            coords.len(),
            types.join(", "),
            values.len()
        )));
    }

    let parsed = values
        .iter()
        .zip(&coords)
        .map(|(s, c)| c.coord_type().parse_value(s))
        .collect::<Result<Vec<_>, _>>()?;

    let loc = index.fetch(group, &parsed)?.ok_or_else(|| {
        CliError::NotFound(format!(
            "no record in group '{group}' at [{}]",
            values.join(", ")
        ))
    })?;
    let file = index.file(loc.file_no).map_or("(unknown)", |f| f.path.as_str());

    println!("File:      {file}");
    println!("Position:  {}", loc.pos);
    println!("BMS pos:   {}", loc.bms_pos);
    println!("Scan mode: {}", loc.scan_mode);
    Ok(())
}
