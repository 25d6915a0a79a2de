//! Merge the coordinate sets of several partitions.
//!
//! Runtime coordinates are merged value by value into one running axis, since
//! every run of every partition must stay addressable. All other coordinate
//! types are kept whole: structurally equal coordinates collapse into one,
//! distinct ones all survive in first-seen order.

use crate::builder::CoordinateBuilder;
use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::value::{AxisValue, CoordinateType};
use rustc_hash::FxHashMap;
use tracing::warn;

#[derive(Debug)]
pub struct CoordinateUnionizer {
    runtime: CoordinateBuilder,
    runtime_seen: bool,
    distinct: Vec<Coordinate>,
    positions: FxHashMap<Coordinate, usize>,
    run_partitions: FxHashMap<AxisValue, usize>,
    conflicts: Vec<String>,
    next_partition: usize,
}

impl Default for CoordinateUnionizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinateUnionizer {
    pub fn new() -> Self {
        Self {
            runtime: CoordinateBuilder::new(CoordinateType::Runtime),
            runtime_seen: false,
            distinct: Vec::new(),
            positions: FxHashMap::default(),
            run_partitions: FxHashMap::default(),
            conflicts: Vec::new(),
            next_partition: 0,
        }
    }

    /// Add the coordinates of the next partition (numbered by call order).
    pub fn add_coordinates(&mut self, coords: &[Coordinate]) -> Result<()> {
        self.add_partition(self.next_partition, coords)
    }

    /// Add the coordinates of partition `partition`. For a runtime seen in
    /// several partitions the last one added owns it.
    pub fn add_partition(&mut self, partition: usize, coords: &[Coordinate]) -> Result<()> {
        self.next_partition = self.next_partition.max(partition + 1);
        for coord in coords {
            if coord.coord_type() == CoordinateType::Runtime {
                self.merge_runtime(partition, coord)?;
            } else if !self.positions.contains_key(coord) {
                self.positions.insert(coord.clone(), self.distinct.len());
                self.distinct.push(coord.clone());
            }
        }
        Ok(())
    }

    fn merge_runtime(&mut self, partition: usize, coord: &Coordinate) -> Result<()> {
        if self.runtime_seen
            && coord.size() == self.runtime.value_count()
            && coord.values().iter().all(|v| self.runtime.contains_value(v))
        {
            let conflict = Error::union_conflict(format!(
                "partition {} runtime coordinate equals the union of {} runtimes",
                partition,
                coord.size()
            ));
            warn!(partition, runtimes = coord.size(), "{conflict}");
            self.conflicts.push(conflict.to_string());
        }
        self.runtime.add_all(coord)?;
        for v in coord.values() {
            self.run_partitions.insert(*v, partition);
        }
        self.runtime_seen = true;
        Ok(())
    }

    pub fn finish(mut self) -> Result<UnionResult> {
        let mut coordinates = Vec::with_capacity(self.distinct.len() + 1);
        let mut run_to_partition = Vec::new();
        let runtime_position = if self.runtime_seen {
            let runtime = self.runtime.finish()?.coordinate.clone();
            for v in runtime.values() {
                let part = self
                    .run_partitions
                    .get(v)
                    .copied()
                    .ok_or_else(|| Error::not_found(format!("partition for runtime {v}")))?;
                run_to_partition.push(part);
            }
            coordinates.push(runtime);
            Some(0)
        } else {
            None
        };

        let offset = coordinates.len();
        coordinates.extend(self.distinct);
        let positions = self
            .positions
            .into_iter()
            .map(|(c, i)| (c, i + offset))
            .collect();

        Ok(UnionResult {
            coordinates,
            runtime_position,
            positions,
            run_to_partition,
            conflicts: self.conflicts,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UnionResult {
    /// Runtime union first (if any runtime was seen), then every distinct
    /// non-runtime coordinate.
    pub coordinates: Vec<Coordinate>,
    pub runtime_position: Option<usize>,
    positions: FxHashMap<Coordinate, usize>,
    /// Owning partition for each value of the runtime union.
    pub run_to_partition: Vec<usize>,
    pub conflicts: Vec<String>,
}

impl UnionResult {
    pub fn runtime(&self) -> Option<&Coordinate> {
        self.runtime_position.map(|i| &self.coordinates[i])
    }

    /// Union position of an input coordinate. Every runtime coordinate maps to
    /// the runtime union.
    pub fn position_of(&self, coord: &Coordinate) -> Option<usize> {
        if coord.coord_type() == CoordinateType::Runtime {
            return self.runtime_position;
        }
        self.positions.get(coord).copied()
    }

    /// Translate a partition's coordinate list into union positions.
    pub fn reindex(&self, coords: &[Coordinate]) -> Result<Vec<usize>> {
        coords
            .iter()
            .map(|c| {
                self.position_of(c).ok_or_else(|| {
                    Error::not_found(format!("{} coordinate not in union", c.coord_type()))
                })
            })
            .collect()
    }

    /// Partition that owns runtime `value`.
    pub fn partition_of_run(&self, value: &AxisValue) -> Option<usize> {
        let idx = self.runtime()?.index_of(value)?;
        self.run_to_partition.get(idx).copied()
    }
}
