//! Per-group record-location blobs.
//!
//! ```text
//! rank: varint
//! shape: varint × rank
//! ndups: varint
//! occupied: varint
//! [occupied × cell]
//!   flat_delta: varint    // flat index minus previous flat index (first: flat index)
//!   file_no: varint
//!   pos: varint
//!   bms_pos: varint
//!   scan_mode: u8
//! ```
//!
//! Only the record that won each cell is written. Records shadowed by a
//! duplicate are gone after a round trip; the duplicate count is kept.

use crate::error::{IndexError, Result};
use crate::varint::{decode_len, decode_u8, decode_varint, encode_varint};
use gribx_core::SparseArray;

/// Upper bound on the rank of a persisted sparse array.
const MAX_RANK: usize = 16;

/// Where a record lives in the source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RecordLocation {
    /// Index into the collection's file inventory.
    pub file_no: u32,
    /// Byte offset of the message in the file.
    pub pos: u64,
    /// Byte offset of the message's bitmap section, or 0.
    pub bms_pos: u64,
    pub scan_mode: u8,
}

impl RecordLocation {
    pub fn new(file_no: u32, pos: u64) -> Self {
        Self {
            file_no,
            pos,
            ..Default::default()
        }
    }
}

pub fn encode_group_records(sparse: &SparseArray<RecordLocation>, buf: &mut Vec<u8>) {
    encode_varint(sparse.rank() as u64, buf);
    for &size in sparse.shape() {
        encode_varint(size as u64, buf);
    }
    encode_varint(sparse.duplicate_count() as u64, buf);
    encode_varint(sparse.occupied_count() as u64, buf);

    let mut prev = 0usize;
    for (flat, _, loc) in sparse.iter_occupied() {
        encode_varint((flat - prev) as u64, buf);
        prev = flat;
        encode_varint(loc.file_no as u64, buf);
        encode_varint(loc.pos, buf);
        encode_varint(loc.bms_pos, buf);
        buf.push(loc.scan_mode);
    }
}

pub fn decode_group_records(data: &[u8]) -> Result<SparseArray<RecordLocation>> {
    let mut pos = 0;
    let rank = decode_len(data, &mut pos, MAX_RANK, "rank")?;
    let mut shape = Vec::with_capacity(rank);
    for _ in 0..rank {
        shape.push(decode_len(data, &mut pos, u32::MAX as usize, "axis size")?);
    }
    let ndups = decode_len(data, &mut pos, usize::MAX, "duplicate count")?;
    // Each cell takes at least 5 bytes.
    let occupied = decode_len(data, &mut pos, data.len() / 5, "occupied count")?;

    let mut cells = Vec::with_capacity(occupied);
    let mut flat = 0usize;
    for i in 0..occupied {
        let delta = decode_len(data, &mut pos, u32::MAX as usize, "flat delta")?;
        if i > 0 && delta == 0 {
            return Err(IndexError::corrupt("repeated cell in record section"));
        }
        flat += delta;
        let file_no = decode_varint(data, &mut pos)?;
        let file_no = u32::try_from(file_no)
            .map_err(|_| IndexError::corrupt(format!("file number {file_no} out of range")))?;
        let loc = RecordLocation {
            file_no,
            pos: decode_varint(data, &mut pos)?,
            bms_pos: decode_varint(data, &mut pos)?,
            scan_mode: decode_u8(data, &mut pos)?,
        };
        cells.push((flat, loc));
    }
    if pos != data.len() {
        return Err(IndexError::corrupt(format!(
            "{} trailing bytes after record blob",
            data.len() - pos
        )));
    }

    SparseArray::from_occupied(&shape, cells, ndups)
        .map_err(|e| IndexError::corrupt(format!("record section: {e}")))
}
