//! Metadata message: everything except the record locations.
//!
//! ```text
//! name: str
//! top_dir: str
//! files: varint count, [path: str, last_modified: zigzag, length: varint, index: varint]*
//! coordinates: varint count, [coordinate]*
//!   type: u8, ascending: u8, count: varint, [value]*
//!   value by type:
//!     runtime | time:   zigzag
//!     timeIntv:         zigzag start, zigzag end
//!     vert:             u8 layer flag, f64 BE value1, [f64 BE value2]
//!     ens:              zigzag
//! groups: varint count, [name: str, rank: varint, [coord: varint]*, records_pos: varint, records_len: varint]*
//! partitions: varint count, [name: str]*
//! master_runtime: varint (0 = none, else coordinate index + 1)
//! run_to_partition: varint count, [partition: varint]*
//! ```
//!
//! `str` is a varint byte length followed by UTF-8.

use crate::error::{IndexError, Result};
use crate::mfile::MFile;
use crate::varint::{
    decode_f64, decode_len, decode_len_str, decode_signed, decode_u8, decode_varint,
    encode_f64, encode_len_str, encode_signed, encode_varint,
};
use gribx_core::{AxisValue, Coordinate, CoordinateType, Level, TimeInterval};

/// Location of one group's blob inside the record section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    /// Positions into [`IndexMetadata::coordinates`], one per axis.
    pub coord_index: Vec<usize>,
    /// Offset from the start of the record section.
    pub records_pos: u64,
    pub records_len: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexMetadata {
    pub name: String,
    pub top_dir: String,
    pub files: Vec<MFile>,
    pub coordinates: Vec<Coordinate>,
    pub groups: Vec<GroupEntry>,
    pub partitions: Vec<String>,
    pub master_runtime: Option<usize>,
    pub run_to_partition: Vec<usize>,
}

impl IndexMetadata {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        encode_len_str(&self.name, buf);
        encode_len_str(&self.top_dir, buf);

        encode_varint(self.files.len() as u64, buf);
        for file in &self.files {
            encode_len_str(&file.path, buf);
            encode_signed(file.last_modified, buf);
            encode_varint(file.length, buf);
            encode_varint(file.index as u64, buf);
        }

        encode_varint(self.coordinates.len() as u64, buf);
        for coord in &self.coordinates {
            encode_coordinate(coord, buf);
        }

        encode_varint(self.groups.len() as u64, buf);
        for group in &self.groups {
            encode_len_str(&group.name, buf);
            encode_varint(group.coord_index.len() as u64, buf);
            for &idx in &group.coord_index {
                encode_varint(idx as u64, buf);
            }
            encode_varint(group.records_pos, buf);
            encode_varint(group.records_len, buf);
        }

        encode_varint(self.partitions.len() as u64, buf);
        for name in &self.partitions {
            encode_len_str(name, buf);
        }

        encode_varint(self.master_runtime.map_or(0, |i| i as u64 + 1), buf);
        encode_varint(self.run_to_partition.len() as u64, buf);
        for &part in &self.run_to_partition {
            encode_varint(part as u64, buf);
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut pos = 0;
        // Every list element takes at least one byte, which bounds counts.
        let limit = data.len();

        let name = decode_len_str(data, &mut pos)?;
        let top_dir = decode_len_str(data, &mut pos)?;

        let n_files = decode_len(data, &mut pos, limit, "file count")?;
        let mut files = Vec::with_capacity(n_files);
        for _ in 0..n_files {
            let path = decode_len_str(data, &mut pos)?;
            let last_modified = decode_signed(data, &mut pos)?;
            let length = decode_varint(data, &mut pos)?;
            let index = decode_len(data, &mut pos, u32::MAX as usize, "file index")? as u32;
            files.push(MFile {
                path,
                last_modified,
                length,
                index,
            });
        }

        let n_coords = decode_len(data, &mut pos, limit, "coordinate count")?;
        let mut coordinates = Vec::with_capacity(n_coords);
        for _ in 0..n_coords {
            coordinates.push(decode_coordinate(data, &mut pos)?);
        }

        let n_groups = decode_len(data, &mut pos, limit, "group count")?;
        let mut groups = Vec::with_capacity(n_groups);
        for _ in 0..n_groups {
            let name = decode_len_str(data, &mut pos)?;
            let rank = decode_len(data, &mut pos, limit, "group rank")?;
            let mut coord_index = Vec::with_capacity(rank);
            for _ in 0..rank {
                let idx = decode_len(data, &mut pos, usize::MAX, "coordinate index")?;
                if idx >= coordinates.len() {
                    return Err(IndexError::corrupt(format!(
                        "group '{name}' references coordinate {idx} of {}",
                        coordinates.len()
                    )));
                }
                coord_index.push(idx);
            }
            groups.push(GroupEntry {
                name,
                coord_index,
                records_pos: decode_varint(data, &mut pos)?,
                records_len: decode_varint(data, &mut pos)?,
            });
        }

        let n_parts = decode_len(data, &mut pos, limit, "partition count")?;
        let mut partitions = Vec::with_capacity(n_parts);
        for _ in 0..n_parts {
            partitions.push(decode_len_str(data, &mut pos)?);
        }

        let master_runtime = match decode_len(data, &mut pos, usize::MAX, "master runtime")? {
            0 => None,
            i if i - 1 < coordinates.len() => {
                let coord_type = coordinates[i - 1].coord_type();
                if coord_type != CoordinateType::Runtime {
                    return Err(IndexError::corrupt(format!(
                        "master runtime coordinate {} is a {coord_type} axis",
                        i - 1
                    )));
                }
                Some(i - 1)
            }
            i => {
                return Err(IndexError::corrupt(format!(
                    "master runtime coordinate {} of {}",
                    i - 1,
                    coordinates.len()
                )))
            }
        };

        let n_runs = decode_len(data, &mut pos, limit, "run count")?;
        let mut run_to_partition = Vec::with_capacity(n_runs);
        for _ in 0..n_runs {
            run_to_partition.push(decode_len(data, &mut pos, usize::MAX, "partition index")?);
        }

        if pos != data.len() {
            return Err(IndexError::corrupt(format!(
                "{} trailing bytes after metadata",
                data.len() - pos
            )));
        }

        Ok(Self {
            name,
            top_dir,
            files,
            coordinates,
            groups,
            partitions,
            master_runtime,
            run_to_partition,
        })
    }
}

fn encode_coordinate(coord: &Coordinate, buf: &mut Vec<u8>) {
    buf.push(coord.coord_type().as_u8());
    buf.push(coord.is_ascending() as u8);
    encode_varint(coord.size() as u64, buf);
    for value in coord.values() {
        match value {
            AxisValue::Runtime(v) | AxisValue::Time(v) => encode_signed(*v, buf),
            AxisValue::TimeInterval(tinv) => {
                encode_signed(tinv.start, buf);
                encode_signed(tinv.end, buf);
            }
            AxisValue::Vertical(level) => match level.value2() {
                Some(v2) => {
                    buf.push(1);
                    encode_f64(level.value1(), buf);
                    encode_f64(v2, buf);
                }
                None => {
                    buf.push(0);
                    encode_f64(level.value1(), buf);
                }
            },
            AxisValue::Ensemble(v) => encode_signed(*v as i64, buf),
        }
    }
}

fn decode_coordinate(data: &[u8], pos: &mut usize) -> Result<Coordinate> {
    let tag = decode_u8(data, pos)?;
    let coord_type = CoordinateType::from_u8(tag)
        .ok_or_else(|| IndexError::corrupt(format!("unknown coordinate type {tag}")))?;
    let ascending = match decode_u8(data, pos)? {
        0 => false,
        1 => true,
        other => return Err(IndexError::corrupt(format!("bad direction flag {other}"))),
    };
    let remaining = data.len().saturating_sub(*pos);
    let count = decode_len(data, pos, remaining, "coordinate size")?;

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let value = match coord_type {
            CoordinateType::Runtime => AxisValue::Runtime(decode_signed(data, pos)?),
            CoordinateType::Time => AxisValue::Time(decode_signed(data, pos)?),
            CoordinateType::TimeInterval => {
                let start = decode_signed(data, pos)?;
                let end = decode_signed(data, pos)?;
                AxisValue::TimeInterval(TimeInterval::new(start, end))
            }
            CoordinateType::Vertical => match decode_u8(data, pos)? {
                0 => AxisValue::Vertical(Level::point(decode_f64(data, pos)?)),
                1 => {
                    let v1 = decode_f64(data, pos)?;
                    let v2 = decode_f64(data, pos)?;
                    AxisValue::Vertical(Level::layer(v1, v2))
                }
                other => return Err(IndexError::corrupt(format!("bad level flag {other}"))),
            },
            CoordinateType::Ensemble => {
                let v = decode_signed(data, pos)?;
                let member = i32::try_from(v)
                    .map_err(|_| IndexError::corrupt(format!("ensemble member {v} out of range")))?;
                AxisValue::Ensemble(member)
            }
        };
        values.push(value);
    }

    Coordinate::from_sorted(coord_type, values, ascending)
        .map_err(|e| IndexError::corrupt(format!("{coord_type} coordinate: {e}")))
}
