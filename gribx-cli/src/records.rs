//! JSON-lines record inventories.
//!
//! One object per line:
//!
//! ```text
//! {"group": "TMP", "file": "gfs_00.grib2", "pos": 1024, "runtime": 0, "time": 6, "level": 500}
//! ```
//!
//! `bms_pos`, `scan_mode`, `time`, `interval` (`[start, end]`), `level`,
//! `level2` (makes a layer) and `member` are optional. The axes of a group are
//! taken from the fields present on its first record.

use crate::error::{CliError, CliResult};
use gribx_core::{AxisRecord, CoordinateBuilder, CoordinateType, Level, TimeInterval};
use gribx_index::{LocatedRecord, MFile, RecordLocation};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordLine {
    pub group: String,
    pub file: String,
    pub pos: u64,
    #[serde(default)]
    pub bms_pos: u64,
    #[serde(default)]
    pub scan_mode: u8,
    pub runtime: i64,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub interval: Option<[i64; 2]>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub level2: Option<f64>,
    #[serde(default)]
    pub member: Option<i32>,
}

impl RecordLine {
    /// Axis builders for a group whose first record is `self`, in
    /// runtime / time / ensemble / vertical order.
    pub fn axes(&self, nested_time: bool) -> Vec<CoordinateBuilder> {
        let time_type = if self.interval.is_some() {
            Some(CoordinateType::TimeInterval)
        } else if self.time.is_some() {
            Some(CoordinateType::Time)
        } else {
            None
        };

        let mut axes = Vec::with_capacity(4);
        match time_type {
            Some(t) if nested_time => {
                axes.push(CoordinateBuilder::hierarchical(CoordinateType::Runtime, t))
            }
            Some(t) => {
                axes.push(CoordinateBuilder::new(CoordinateType::Runtime));
                axes.push(CoordinateBuilder::new(t));
            }
            None => axes.push(CoordinateBuilder::new(CoordinateType::Runtime)),
        }
        if self.member.is_some() {
            axes.push(CoordinateBuilder::new(CoordinateType::Ensemble));
        }
        if self.level.is_some() {
            axes.push(CoordinateBuilder::new(CoordinateType::Vertical));
        }
        axes
    }

    pub fn into_record(self, file_no: u32) -> JsonRecord {
        JsonRecord {
            location: RecordLocation {
                file_no,
                pos: self.pos,
                bms_pos: self.bms_pos,
                scan_mode: self.scan_mode,
            },
            runtime: self.runtime,
            time: self.time,
            interval: self.interval.map(|[s, e]| TimeInterval::new(s, e)),
            level: match (self.level, self.level2) {
                (Some(a), Some(b)) => Some(Level::layer(a, b)),
                (Some(a), None) => Some(Level::point(a)),
                _ => None,
            },
            member: self.member,
        }
    }
}

/// A decoded inventory record.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    pub location: RecordLocation,
    pub runtime: i64,
    pub time: Option<i64>,
    pub interval: Option<TimeInterval>,
    pub level: Option<Level>,
    pub member: Option<i32>,
}

impl AxisRecord for JsonRecord {
    fn runtime(&self) -> i64 {
        self.runtime
    }

    fn time_offset(&self) -> Option<i64> {
        self.time
    }

    fn time_interval(&self) -> Option<TimeInterval> {
        self.interval
    }

    fn level(&self) -> Option<Level> {
        self.level
    }

    fn ensemble_member(&self) -> Option<i32> {
        self.member
    }
}

impl LocatedRecord for JsonRecord {
    fn location(&self) -> RecordLocation {
        self.location
    }
}

/// Parse an inventory file. Blank lines and lines starting with `#` are
/// skipped.
pub fn read_records(path: &Path) -> CliResult<Vec<RecordLine>> {
    let file = std::fs::File::open(path)
        .map_err(|e| CliError::Input(format!("failed to open {}: {e}", path.display())))?;
    let mut records = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let record: RecordLine = serde_json::from_str(line).map_err(|e| {
            CliError::Input(format!("{}:{}: {e}", path.display(), n + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// File inventory in first-seen order, stat'ed under `top_dir`, plus the
/// file number of every path.
pub fn file_inventory(
    records: &[RecordLine],
    top_dir: &Path,
) -> CliResult<(Vec<MFile>, FxHashMap<String, u32>)> {
    let mut files = Vec::new();
    let mut numbers: FxHashMap<String, u32> = FxHashMap::default();
    for record in records {
        if numbers.contains_key(&record.file) {
            continue;
        }
        let index = files.len() as u32;
        let file = MFile::from_disk(top_dir, &record.file, index).map_err(|e| {
            CliError::Input(format!(
                "cannot stat {}: {e}",
                top_dir.join(&record.file).display()
            ))
        })?;
        numbers.insert(record.file.clone(), index);
        files.push(file);
    }
    Ok((files, numbers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(json: &str) -> RecordLine {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_axes_from_first_record() {
        let l = line(
            r#"{"group":"g","file":"a","pos":0,"runtime":0,"time":6,"level":500,"member":1}"#,
        );
        let types: Vec<_> = l.axes(false).iter().map(|b| b.coord_type()).collect();
        assert_eq!(
            types,
            vec![
                CoordinateType::Runtime,
                CoordinateType::Time,
                CoordinateType::Ensemble,
                CoordinateType::Vertical
            ]
        );

        let nested = l.axes(true);
        assert_eq!(nested.len(), 3);
        assert_eq!(nested[0].child_type(), Some(CoordinateType::Time));
    }

    #[test]
    fn test_into_record() {
        let l = line(
            r#"{"group":"g","file":"a","pos":9,"bms_pos":4,"runtime":0,"interval":[0,6],"level":0,"level2":10}"#,
        );
        let r = l.into_record(2);
        assert_eq!(r.location, RecordLocation { file_no: 2, pos: 9, bms_pos: 4, scan_mode: 0 });
        assert_eq!(r.time_interval(), Some(TimeInterval::new(0, 6)));
        assert!(r.level().unwrap().is_layer());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<RecordLine>(
            r#"{"group":"g","file":"a","pos":0,"runtime":0,"colour":"red"}"#
        )
        .is_err());
    }

    #[test]
    fn test_read_records_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.jsonl");
        std::fs::write(
            &path,
            "# inventory\n{\"group\":\"g\",\"file\":\"a\",\"pos\":0,\"runtime\":0}\n\n{bad\n",
        )
        .unwrap();
        match read_records(&path) {
            Err(CliError::Input(msg)) => assert!(msg.contains(":4:"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
