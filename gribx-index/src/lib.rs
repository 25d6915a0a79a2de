//! # gribx index
//!
//! Persistent indexes over collections of gridded records.
//!
//! This crate provides:
//! - Building: `CollectionBuilder` scans `LocatedRecord`s into per-group
//!   coordinate spaces
//! - Merging: `merge_partitions` unions partition indexes into one
//! - Persistence: versioned binary files via `IndexWriter` / `read_index_file`
//! - Freshness: `update_needed` decides when an index must be rebuilt
//!
//! ## File layout
//!
//! ```text
//! magic[20] | version i32 BE | record-section length i64 BE
//! record section (one blob per group)
//! varint metadata length | metadata message
//! ```
//!
//! A reader rejects any file that deviates from this layout with
//! [`IndexError::CorruptIndex`]; the writer never leaves a partial file
//! behind.

pub mod collection;
pub mod config;
pub mod error;
pub mod format;
pub mod mfile;
pub mod reader;
pub mod update;
pub mod varint;
pub mod writer;

pub use collection::{
    merge_partitions, CollectionBuilder, CollectionIndex, GroupIndex, LocatedRecord,
};
pub use config::IndexConfig;
pub use error::{IndexError, Result};
pub use format::records::RecordLocation;
pub use format::{IndexHeader, IndexKind, FORMAT_VERSION};
pub use mfile::MFile;
pub use reader::{read_index_file, read_index_kind, RawIndex};
pub use update::{update_needed, CollectionUpdateType};
pub use writer::{IndexWriter, WriterState};
