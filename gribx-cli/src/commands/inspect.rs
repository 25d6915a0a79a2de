use crate::error::CliResult;
use comfy_table::{ContentArrangement, Table};
use gribx_core::Coordinate;
use gribx_index::{CollectionIndex, IndexConfig};
use serde_json::json;
use std::path::Path;

pub fn run(index_path: &Path, as_json: bool, config: &IndexConfig) -> CliResult<()> {
    let index = CollectionIndex::read(index_path, config)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&to_json(&index))?);
        return Ok(());
    }

    println!("Kind:       {}", index.kind);
    println!("Name:       {}", index.name);
    println!("Top dir:    {}", index.top_dir);
    println!("Files:      {}", index.files.len());
    if !index.partitions.is_empty() {
        println!("Partitions: {}", index.partitions.join(", "));
    }
    if let Some(master) = index.master_runtime() {
        println!("Runtimes:   {}", axis_range(master));
    }
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["GROUP", "AXIS", "TYPE", "SPACING", "SIZE", "VALUES"]);
    for group in &index.groups {
        for (axis, coord) in index.group_coordinates(group).into_iter().enumerate() {
            table.add_row(vec![
                if axis == 0 { group.name.clone() } else { String::new() },
                axis.to_string(),
                coord.coord_type().to_string(),
                coord.spacing().name().to_string(),
                coord.size().to_string(),
                axis_range(coord),
            ]);
        }
    }
    println!("{table}");

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["GROUP", "SHAPE", "RECORDS", "DUPLICATES", "DENSITY"]);
    for group in &index.groups {
        let sparse = &group.sparse;
        table.add_row(vec![
            group.name.clone(),
            format!("{:?}", sparse.shape()),
            sparse.occupied_count().to_string(),
            sparse.duplicate_count().to_string(),
            format!("{:.3}", sparse.density()),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn axis_range(coord: &Coordinate) -> String {
    match coord.values() {
        [] => "(empty)".to_string(),
        [only] => only.to_string(),
        [first, .., last] => format!("{first} .. {last}"),
    }
}

fn to_json(index: &CollectionIndex) -> serde_json::Value {
    let groups: Vec<_> = index
        .groups
        .iter()
        .map(|group| {
            let axes: Vec<_> = index
                .group_coordinates(group)
                .into_iter()
                .map(|c| {
                    json!({
                        "type": c.coord_type().name(),
                        "spacing": c.spacing().name(),
                        "ascending": c.is_ascending(),
                        "values": c.values().iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            json!({
                "name": group.name,
                "axes": axes,
                "shape": group.sparse.shape(),
                "records": group.sparse.occupied_count(),
                "duplicates": group.sparse.duplicate_count(),
                "density": group.sparse.density(),
            })
        })
        .collect();

    json!({
        "kind": index.kind.to_string(),
        "name": index.name,
        "top_dir": index.top_dir,
        "files": index.files.iter().map(|f| &f.path).collect::<Vec<_>>(),
        "partitions": index.partitions,
        "run_to_partition": index.run_to_partition,
        "groups": groups,
    })
}
