//! Index file binary format.
//!
//! ```text
//! offset 0       : magic, ASCII, 20 bytes ("Grib2CollectionIndex" | "Grib2Partition0Index")
//! offset 20      : i32 BE  format version
//! offset 24      : i64 BE  length L of the record-location section (back-patched)
//! offset 32      : record-location section, one blob per group
//! offset 32+L    : varint  metadata message length
//! offset ...     : metadata message
//! ```
//!
//! The fixed-width header fields are big-endian; everything inside the
//! record section and the metadata message uses LEB128 varints.

pub mod metadata;
pub mod records;

use crate::error::{IndexError, Result};
use std::fmt;

pub const MAGIC_LEN: usize = 20;

pub const COLLECTION_MAGIC: [u8; MAGIC_LEN] = *b"Grib2CollectionIndex";
pub const PARTITION_MAGIC: [u8; MAGIC_LEN] = *b"Grib2Partition0Index";

/// Current format version.
pub const FORMAT_VERSION: i32 = 2;

/// Header size in bytes.
pub const HEADER_LEN: usize = 32;

/// Default cap on the metadata message length: 100 MB.
pub const DEFAULT_MAX_METADATA_BYTES: u64 = 100 * 1000 * 1000;

/// What an index file describes, selected by its magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Built directly from a record scan.
    Collection,
    /// Merged from several partition indexes.
    Partition,
}

impl IndexKind {
    pub fn magic(self) -> &'static [u8; MAGIC_LEN] {
        match self {
            IndexKind::Collection => &COLLECTION_MAGIC,
            IndexKind::Partition => &PARTITION_MAGIC,
        }
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic == COLLECTION_MAGIC {
            Some(IndexKind::Collection)
        } else if magic == PARTITION_MAGIC {
            Some(IndexKind::Partition)
        } else {
            None
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Collection => f.write_str("collection"),
            IndexKind::Partition => f.write_str("partition"),
        }
    }
}

/// Fixed 32-byte file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub kind: IndexKind,
    pub version: i32,
    pub records_len: u64,
}

impl IndexHeader {
    pub fn new(kind: IndexKind) -> Self {
        Self {
            kind,
            version: FORMAT_VERSION,
            records_len: 0,
        }
    }

    pub fn write_to(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_LEN);
        buf[0..20].copy_from_slice(self.kind.magic());
        buf[20..24].copy_from_slice(&self.version.to_be_bytes());
        buf[24..32].copy_from_slice(&self.records_len.to_be_bytes());
    }

    pub fn read_from(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(IndexError::corrupt(format!(
                "header too small: {} < {}",
                buf.len(),
                HEADER_LEN
            )));
        }
        let kind = IndexKind::from_magic(&buf[0..20])
            .ok_or_else(|| IndexError::corrupt("invalid magic bytes"))?;

        let mut word = [0u8; 4];
        word.copy_from_slice(&buf[20..24]);
        let version = i32::from_be_bytes(word);
        if version != FORMAT_VERSION {
            return Err(IndexError::corrupt(format!(
                "unsupported version {version} (expected {FORMAT_VERSION})"
            )));
        }

        let mut long = [0u8; 8];
        long.copy_from_slice(&buf[24..32]);
        let records_len = i64::from_be_bytes(long);
        if records_len < 0 {
            return Err(IndexError::corrupt(format!(
                "negative record section length {records_len}"
            )));
        }

        Ok(Self {
            kind,
            version,
            records_len: records_len as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magics_have_equal_length() {
        assert_eq!(COLLECTION_MAGIC.len(), PARTITION_MAGIC.len());
        assert_eq!(IndexKind::from_magic(b"Grib2Partition0Index"), Some(IndexKind::Partition));
        assert_eq!(IndexKind::from_magic(b"Grib1CollectionIndex"), None);
    }

    #[test]
    fn test_header_round_trip() {
        let header = IndexHeader {
            kind: IndexKind::Partition,
            version: FORMAT_VERSION,
            records_len: 0x0102_0304,
        };
        let mut buf = [0u8; HEADER_LEN];
        header.write_to(&mut buf);
        assert_eq!(&buf[20..24], &[0, 0, 0, 2]);
        assert_eq!(IndexHeader::read_from(&buf).unwrap(), header);
    }

    #[test]
    fn test_header_rejects_bad_version() {
        let mut buf = [0u8; HEADER_LEN];
        IndexHeader::new(IndexKind::Collection).write_to(&mut buf);
        buf[23] = 9;
        assert!(matches!(
            IndexHeader::read_from(&buf),
            Err(IndexError::CorruptIndex(_))
        ));
        assert!(IndexHeader::read_from(&buf[..10]).is_err());
    }
}
