//! Collection indexes: build from a record scan, merge partitions, query.
//!
//! A collection holds one or more groups (independent variables/grids).
//! Every group has its own axes and sparse array; structurally equal
//! coordinates are stored once and shared between groups.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::format::metadata::{GroupEntry, IndexMetadata};
use crate::format::records::{decode_group_records, encode_group_records, RecordLocation};
use crate::format::IndexKind;
use crate::mfile::MFile;
use crate::reader::{read_index_file, RawIndex};
use crate::writer::IndexWriter;
use gribx_core::{
    AxisRecord, AxisValue, CancelToken, Coordinate, CoordinateBuilder, CoordinateNd,
    CoordinateSharer, CoordinateType, CoordinateUnionizer, SearchMode, SparseArray,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A record that knows where it is stored.
pub trait LocatedRecord: AxisRecord {
    fn location(&self) -> RecordLocation;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupIndex {
    pub name: String,
    /// Positions into [`CollectionIndex::coordinates`], one per axis.
    pub coord_index: Vec<usize>,
    pub sparse: SparseArray<RecordLocation>,
}

impl GroupIndex {
    pub fn rank(&self) -> usize {
        self.coord_index.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionIndex {
    pub kind: IndexKind,
    pub name: String,
    pub top_dir: String,
    pub files: Vec<MFile>,
    pub coordinates: Vec<Coordinate>,
    pub groups: Vec<GroupIndex>,
    /// Names of the merged partitions, in merge order.
    pub partitions: Vec<String>,
    /// Runtime union across all groups (merged indexes only).
    pub master_runtime: Option<usize>,
    /// Owning partition for each value of the master runtime.
    pub run_to_partition: Vec<usize>,
}

impl CollectionIndex {
    pub fn group(&self, name: &str) -> Result<&GroupIndex> {
        self.find_group(name)
            .ok_or_else(|| IndexError::UnknownGroup(name.to_string()))
    }

    fn find_group(&self, name: &str) -> Option<&GroupIndex> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Axes of a group in stride order.
    pub fn group_coordinates(&self, group: &GroupIndex) -> Vec<&Coordinate> {
        group
            .coord_index
            .iter()
            .map(|&i| &self.coordinates[i])
            .collect()
    }

    pub fn axis(&self, group: &str, axis: usize) -> Result<&Coordinate> {
        let g = self.group(group)?;
        let idx = g.coord_index.get(axis).ok_or_else(|| {
            gribx_core::Error::index_out_of_range(format!(
                "axis {axis} of group '{group}' with rank {}",
                g.rank()
            ))
        })?;
        Ok(&self.coordinates[*idx])
    }

    pub fn file(&self, file_no: u32) -> Option<&MFile> {
        self.files.get(file_no as usize)
    }

    /// Location of the record at one exact value per axis, or `None` when a
    /// value is not on its axis or the cell is empty.
    pub fn fetch(&self, group: &str, values: &[AxisValue]) -> Result<Option<RecordLocation>> {
        let g = self.group(group)?;
        if values.len() != g.rank() {
            return Err(gribx_core::Error::index_out_of_range(format!(
                "{} values for group '{group}' with rank {}",
                values.len(),
                g.rank()
            ))
            .into());
        }
        let mut index = Vec::with_capacity(values.len());
        for (value, coord) in values.iter().zip(self.group_coordinates(g)) {
            match coord.index_of(value) {
                Some(i) => index.push(i),
                None => return Ok(None),
            }
        }
        Ok(g.sparse.fetch(&index)?.copied())
    }

    /// Resolve `target` on one axis of a group.
    pub fn search(
        &self,
        group: &str,
        axis: usize,
        target: f64,
        mode: SearchMode,
        bounded: bool,
    ) -> Result<Option<usize>> {
        Ok(self.axis(group, axis)?.search().find_index(target, mode, bounded)?)
    }

    pub fn master_runtime(&self) -> Option<&Coordinate> {
        self.master_runtime.map(|i| &self.coordinates[i])
    }

    /// Partition that owns runtime `value` in a merged index.
    pub fn partition_of_run(&self, value: &AxisValue) -> Option<&str> {
        let idx = self.master_runtime()?.index_of(value)?;
        let part = *self.run_to_partition.get(idx)?;
        self.partitions.get(part).map(String::as_str)
    }

    /// All runtimes of this index as one coordinate.
    fn runtime_union(&self) -> Result<Option<Coordinate>> {
        if let Some(master) = self.master_runtime() {
            return Ok(Some(master.clone()));
        }
        let mut builder = CoordinateBuilder::new(CoordinateType::Runtime);
        let mut any = false;
        for coord in self
            .coordinates
            .iter()
            .filter(|c| c.coord_type() == CoordinateType::Runtime)
        {
            builder.add_all(coord)?;
            any = true;
        }
        if !any {
            return Ok(None);
        }
        Ok(Some(builder.finish()?.coordinate.clone()))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the index to `path` (resolved through `config`); returns the
    /// path written.
    pub fn write(&self, path: &Path, config: &IndexConfig) -> Result<PathBuf> {
        config.validate()?;
        let path = config.resolve_index_path(path);
        let _span = tracing::info_span!(
            "write_index",
            path = %path.display(),
            kind = %self.kind,
            groups = self.groups.len()
        )
        .entered();

        let mut writer = IndexWriter::create(&path, self.kind, config)?;
        writer.write_header()?;

        let mut entries = Vec::with_capacity(self.groups.len());
        let mut blob = Vec::new();
        for group in &self.groups {
            blob.clear();
            encode_group_records(&group.sparse, &mut blob);
            let records_pos = writer.append_records(&blob)?;
            entries.push(GroupEntry {
                name: group.name.clone(),
                coord_index: group.coord_index.clone(),
                records_pos,
                records_len: blob.len() as u64,
            });
        }
        writer.end_records()?;

        let metadata = IndexMetadata {
            name: self.name.clone(),
            top_dir: self.top_dir.clone(),
            files: self.files.clone(),
            coordinates: self.coordinates.clone(),
            groups: entries,
            partitions: self.partitions.clone(),
            master_runtime: self.master_runtime,
            run_to_partition: self.run_to_partition.clone(),
        };
        let mut message = Vec::new();
        metadata.encode(&mut message);
        writer.write_metadata(&message)?;
        writer.close()?;
        Ok(path)
    }

    /// Read and validate an index written by [`write`](Self::write).
    pub fn read(path: &Path, config: &IndexConfig) -> Result<Self> {
        let path = config.resolve_index_path(path);
        let raw = read_index_file(&path, config)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawIndex) -> Result<Self> {
        let mut groups = Vec::with_capacity(raw.metadata.groups.len());
        let mut names = FxHashSet::default();
        for (i, entry) in raw.metadata.groups.iter().enumerate() {
            if !names.insert(entry.name.as_str()) {
                return Err(IndexError::corrupt(format!("duplicate group '{}'", entry.name)));
            }
            let sparse = decode_group_records(raw.group_records(i)?)?;
            let expected: Vec<usize> = entry
                .coord_index
                .iter()
                .map(|&c| raw.metadata.coordinates[c].size())
                .collect();
            if sparse.shape() != expected.as_slice() {
                return Err(IndexError::corrupt(format!(
                    "group '{}' shape {:?} does not match its axes {:?}",
                    entry.name,
                    sparse.shape(),
                    expected
                )));
            }
            if let Some((_, _, loc)) = sparse
                .iter_occupied()
                .find(|(_, _, loc)| loc.file_no as usize >= raw.metadata.files.len())
            {
                return Err(IndexError::corrupt(format!(
                    "group '{}' references file {} of {}",
                    entry.name,
                    loc.file_no,
                    raw.metadata.files.len()
                )));
            }
            groups.push(GroupIndex {
                name: entry.name.clone(),
                coord_index: entry.coord_index.clone(),
                sparse,
            });
        }

        let meta = raw.metadata;
        let runs = meta.master_runtime.map_or(0, |i| meta.coordinates[i].size());
        if meta.run_to_partition.len() != runs
            || meta.run_to_partition.iter().any(|&p| p >= meta.partitions.len())
        {
            return Err(IndexError::corrupt("run-to-partition table does not match runtimes"));
        }

        Ok(Self {
            kind: raw.header.kind,
            name: meta.name,
            top_dir: meta.top_dir,
            files: meta.files,
            coordinates: meta.coordinates,
            groups,
            partitions: meta.partitions,
            master_runtime: meta.master_runtime,
            run_to_partition: meta.run_to_partition,
        })
    }
}

// ============================================================================
// Build
// ============================================================================

/// Scans records into per-group coordinate spaces.
pub struct CollectionBuilder<R> {
    name: String,
    top_dir: String,
    files: Vec<MFile>,
    groups: Vec<(String, CoordinateNd<R>)>,
    lookup: FxHashMap<String, usize>,
    cancel: Option<(CancelToken, usize)>,
}

impl<R: LocatedRecord> CollectionBuilder<R> {
    pub fn new(name: impl Into<String>, top_dir: impl Into<String>, files: Vec<MFile>) -> Self {
        Self {
            name: name.into(),
            top_dir: top_dir.into(),
            files,
            groups: Vec::new(),
            lookup: FxHashMap::default(),
            cancel: None,
        }
    }

    /// Cancellation for every group added after this call, checked every
    /// `config.cancel_check_every` records.
    pub fn with_cancel(mut self, token: CancelToken, config: &IndexConfig) -> Self {
        self.cancel = Some((token, config.cancel_check_every));
        self
    }

    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        axes: Vec<CoordinateBuilder>,
    ) -> Result<()> {
        let name = name.into();
        if axes.is_empty() {
            return Err(IndexError::invalid_config(format!("group '{name}' has no axes")));
        }
        if self.lookup.contains_key(&name) {
            return Err(IndexError::invalid_config(format!("group '{name}' defined twice")));
        }
        let mut nd = CoordinateNd::new(axes);
        if let Some((token, every)) = &self.cancel {
            nd = nd.with_cancel(token.clone(), *every);
        }
        self.lookup.insert(name.clone(), self.groups.len());
        self.groups.push((name, nd));
        Ok(())
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn add_record(&mut self, group: &str, record: R) -> Result<()> {
        let idx = *self
            .lookup
            .get(group)
            .ok_or_else(|| IndexError::UnknownGroup(group.to_string()))?;
        let file_no = record.location().file_no;
        if file_no as usize >= self.files.len() {
            return Err(IndexError::invalid_config(format!(
                "record references file {file_no} of {}",
                self.files.len()
            )));
        }
        self.groups[idx].1.add_record(record)?;
        Ok(())
    }

    pub fn build(self) -> Result<CollectionIndex> {
        let _span = tracing::info_span!(
            "build_collection",
            name = %self.name,
            groups = self.groups.len()
        )
        .entered();

        let mut sharer = CoordinateSharer::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        for (name, nd) in self.groups {
            let records = nd.record_count();
            if records == 0 {
                warn!(group = %name, "group has no records, skipped");
                continue;
            }
            let result = nd.finish()?;
            let coord_index = sharer.add_coordinates(&result.coordinates);
            let sparse = result.sparse.map(|r| r.location());
            info!(
                group = %name,
                records,
                occupied = sparse.occupied_count(),
                ndups = sparse.duplicate_count(),
                density = sparse.density(),
                "group indexed"
            );
            groups.push(GroupIndex {
                name,
                coord_index,
                sparse,
            });
        }

        Ok(CollectionIndex {
            kind: IndexKind::Collection,
            name: self.name,
            top_dir: self.top_dir,
            files: self.files,
            coordinates: sharer.into_shared(),
            groups,
            partitions: Vec::new(),
            master_runtime: None,
            run_to_partition: Vec::new(),
        })
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Merge partition indexes into one partition-kind index.
///
/// Groups are matched by name. Each group's axes are the union of the
/// partitions' axes; cells are copied in partition order, so a later
/// partition wins a cell both define. File inventories are concatenated and
/// record file numbers shifted accordingly.
pub fn merge_partitions(
    name: &str,
    top_dir: &str,
    partitions: &[(String, CollectionIndex)],
) -> Result<CollectionIndex> {
    let _span =
        tracing::info_span!("merge_partitions", name, partitions = partitions.len()).entered();
    if partitions.is_empty() {
        return Err(IndexError::invalid_config("no partitions to merge"));
    }

    let mut files = Vec::new();
    let mut file_offsets = Vec::with_capacity(partitions.len());
    for (_, part) in partitions {
        file_offsets.push(files.len() as u32);
        for file in &part.files {
            let mut file = file.clone();
            file.index = files.len() as u32;
            files.push(file);
        }
    }

    let mut names: Vec<&str> = Vec::new();
    let mut seen = FxHashSet::default();
    for (_, part) in partitions {
        for g in &part.groups {
            if seen.insert(g.name.as_str()) {
                names.push(g.name.as_str());
            }
        }
    }

    let mut sharer = CoordinateSharer::new();
    let mut groups = Vec::with_capacity(names.len());
    for group_name in names {
        let members: Vec<Member<'_>> = partitions
            .iter()
            .enumerate()
            .filter_map(|(p, (_, index))| {
                index.find_group(group_name).map(|group| Member {
                    partition: p,
                    index,
                    group,
                })
            })
            .collect();
        let (axes, sparse) = merge_group(group_name, &members, &file_offsets)?;
        let coord_index = sharer.add_coordinates(&axes);
        groups.push(GroupIndex {
            name: group_name.to_string(),
            coord_index,
            sparse,
        });
    }

    let mut runs = CoordinateUnionizer::new();
    for (p, (_, part)) in partitions.iter().enumerate() {
        if let Some(runtime) = part.runtime_union()? {
            runs.add_partition(p, &[runtime])?;
        }
    }
    let runs = runs.finish()?;
    let (master_runtime, run_to_partition) = match runs.runtime() {
        Some(master) => (
            Some(sharer.add_coordinates(std::slice::from_ref(master))[0]),
            runs.run_to_partition.clone(),
        ),
        None => (None, Vec::new()),
    };

    info!(
        groups = groups.len(),
        files = files.len(),
        runtimes = run_to_partition.len(),
        "partitions merged"
    );

    Ok(CollectionIndex {
        kind: IndexKind::Partition,
        name: name.to_string(),
        top_dir: top_dir.to_string(),
        files,
        coordinates: sharer.into_shared(),
        groups,
        partitions: partitions.iter().map(|(n, _)| n.clone()).collect(),
        master_runtime,
        run_to_partition,
    })
}

struct Member<'a> {
    partition: usize,
    index: &'a CollectionIndex,
    group: &'a GroupIndex,
}

impl Member<'_> {
    fn axis(&self, i: usize) -> &Coordinate {
        &self.index.coordinates[self.group.coord_index[i]]
    }
}

fn merge_group(
    name: &str,
    members: &[Member<'_>],
    file_offsets: &[u32],
) -> Result<(Vec<Coordinate>, SparseArray<RecordLocation>)> {
    let rank = members[0].group.rank();
    if members.iter().any(|m| m.group.rank() != rank) {
        return Err(IndexError::invalid_config(format!(
            "group '{name}' has different ranks across partitions"
        )));
    }

    let mut unionizer = CoordinateUnionizer::new();
    for m in members {
        let coords: Vec<Coordinate> = (0..rank).map(|i| m.axis(i).clone()).collect();
        unionizer.add_partition(m.partition, &coords)?;
    }
    let union = unionizer.finish()?;

    let mut axes = Vec::with_capacity(rank);
    for i in 0..rank {
        let coord_type = members[0].axis(i).coord_type();
        let mut positions: Vec<usize> = Vec::new();
        for m in members {
            let coord = m.axis(i);
            if coord.coord_type() != coord_type {
                return Err(IndexError::invalid_config(format!(
                    "group '{name}' axis {i} is {} in one partition and {} in another",
                    coord_type,
                    coord.coord_type()
                )));
            }
            let pos = union.position_of(coord).ok_or_else(|| {
                gribx_core::Error::not_found(format!("{coord_type} coordinate not in union"))
            })?;
            if !positions.contains(&pos) {
                positions.push(pos);
            }
        }

        let axis = if let [only] = positions.as_slice() {
            union.coordinates[*only].clone()
        } else {
            let mut builder =
                CoordinateBuilder::new(coord_type).with_order(members[0].axis(i).order());
            for &pos in &positions {
                builder.add_all(&union.coordinates[pos])?;
            }
            debug!(group = name, axis = i, variants = positions.len(), "axis values merged");
            builder.finish()?.coordinate.clone()
        };
        axes.push(axis);
    }

    let shape: Vec<usize> = axes.iter().map(Coordinate::size).collect();
    let mut sparse = SparseArray::new(&shape)?;
    let mut tuple = vec![0usize; rank];
    for m in members {
        for (_, cell, loc) in m.group.sparse.iter_occupied() {
            for (axis, slot) in tuple.iter_mut().enumerate() {
                let value = m.axis(axis).value(cell[axis]).ok_or_else(|| {
                    IndexError::corrupt(format!("group '{name}' cell outside axis {axis}"))
                })?;
                *slot = axes[axis].index_of(value).ok_or_else(|| {
                    gribx_core::Error::not_found(format!("{value} missing from merged axis"))
                })?;
            }
            let mut loc = *loc;
            loc.file_no += file_offsets[m.partition];
            sparse.add(loc, &tuple)?;
        }
    }
    if sparse.duplicate_count() > 0 {
        debug!(
            group = name,
            ndups = sparse.duplicate_count(),
            "cells overridden by later partitions"
        );
    }

    Ok((axes, sparse.compact()))
}
