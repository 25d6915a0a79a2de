//! Index file validation and decoding.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::format::metadata::IndexMetadata;
use crate::format::{IndexHeader, IndexKind, HEADER_LEN, MAGIC_LEN};
use crate::varint::{decode_varint, take};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A validated index file: header, raw record section and decoded metadata.
#[derive(Debug, Clone)]
pub struct RawIndex {
    pub header: IndexHeader,
    pub records: Vec<u8>,
    pub metadata: IndexMetadata,
}

impl RawIndex {
    /// Bytes of one group's record blob.
    pub fn group_records(&self, group: usize) -> Result<&[u8]> {
        let entry = self
            .metadata
            .groups
            .get(group)
            .ok_or_else(|| IndexError::corrupt(format!("no group {group}")))?;
        let start = usize::try_from(entry.records_pos)
            .map_err(|_| IndexError::corrupt("record offset overflow"))?;
        let len = usize::try_from(entry.records_len)
            .map_err(|_| IndexError::corrupt("record length overflow"))?;
        let mut pos = start;
        take(&self.records, &mut pos, len).map_err(|_| {
            IndexError::corrupt(format!(
                "group '{}' records [{start}, +{len}) outside section of {} bytes",
                entry.name,
                self.records.len()
            ))
        })
    }
}

/// Read only the magic to tell collection and partition indexes apart.
pub fn read_index_kind(path: &Path) -> Result<IndexKind> {
    let mut file = std::fs::File::open(path)?;
    let mut magic = [0u8; MAGIC_LEN];
    file.read_exact(&mut magic).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => IndexError::corrupt("file shorter than magic"),
        _ => IndexError::Io(e),
    })?;
    IndexKind::from_magic(&magic).ok_or_else(|| IndexError::corrupt("invalid magic bytes"))
}

/// Read and validate a whole index file.
///
/// Any structural deviation or truncation is `CorruptIndex`; nothing is
/// partially recovered.
pub fn read_index_file(path: &Path, config: &IndexConfig) -> Result<RawIndex> {
    let _span = tracing::debug_span!("read_index", path = %path.display()).entered();
    let bytes = std::fs::read(path)?;
    let header = IndexHeader::read_from(&bytes)?;

    let mut pos = HEADER_LEN;
    let records_len = usize::try_from(header.records_len)
        .map_err(|_| IndexError::corrupt("record section length overflow"))?;
    let records = take(&bytes, &mut pos, records_len)
        .map_err(|_| {
            IndexError::corrupt(format!(
                "record section of {records_len} bytes exceeds file size {}",
                bytes.len()
            ))
        })?
        .to_vec();

    let meta_len = decode_varint(&bytes, &mut pos)?;
    if meta_len > config.max_metadata_bytes {
        return Err(IndexError::corrupt(format!(
            "metadata length {meta_len} exceeds limit {}",
            config.max_metadata_bytes
        )));
    }
    let message = take(&bytes, &mut pos, meta_len as usize)?;
    if pos != bytes.len() {
        return Err(IndexError::corrupt(format!(
            "{} trailing bytes after metadata",
            bytes.len() - pos
        )));
    }
    let metadata = IndexMetadata::decode(message)?;

    debug!(
        kind = %header.kind,
        groups = metadata.groups.len(),
        files = metadata.files.len(),
        "index read"
    );
    Ok(RawIndex {
        header,
        records,
        metadata,
    })
}
