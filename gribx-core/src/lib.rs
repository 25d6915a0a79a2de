//! # gribx core
//!
//! Coordinate discovery, sparse indexing and axis search for collections of
//! gridded records.
//!
//! This crate provides:
//! - Axis values: `AxisValue`, `Level`, `TimeInterval`, `CoordinateType`
//! - Finished axes: `Coordinate` with derived `Spacing`
//! - Value-to-index resolution: `AxisSearch`
//! - Record scanning: `CoordinateBuilder`, `CoordinateNd`, `SparseArray`
//! - Partition merging: `CoordinateUnionizer`, `CoordinateSharer`
//!
//! ## Design Principles
//!
//! 1. **No I/O**: records arrive through the `AxisRecord` trait; persistence
//!    lives in `gribx-index`
//! 2. **Immutable results**: everything returned by `finish()` is read-only
//!    and safe to share between readers
//! 3. **Strict total ordering**: levels order by `f64::total_cmp`, NaN never
//!    reaches an axis
//!
//! ## Example
//!
//! ```ignore
//! use gribx_core::{CoordinateNd, CoordinateType, AxisValue};
//!
//! let mut nd = CoordinateNd::with_types(&[CoordinateType::Runtime, CoordinateType::Time]);
//! for record in records {
//!     nd.add_record(record)?;
//! }
//! let result = nd.finish()?;
//! let rec = result.fetch_by_values(&[AxisValue::Runtime(run), AxisValue::Time(6)])?;
//! ```

pub mod builder;
pub mod cancel;
pub mod coordinate;
pub mod coordinate_nd;
pub mod error;
pub mod search;
pub mod sharer;
pub mod sparse;
pub mod unionizer;
pub mod value;

pub use builder::{CoordinateBuilder, ExtractedValue, FinishedAxis};
pub use cancel::CancelToken;
pub use coordinate::{AxisOrder, Coordinate, Spacing};
pub use coordinate_nd::{CoordinateNd, CoordinateNdResult, NestedAxis, DEFAULT_CHECK_EVERY};
pub use error::{Error, Result};
pub use search::{AxisSearch, SearchMode};
pub use sharer::CoordinateSharer;
pub use sparse::SparseArray;
pub use unionizer::{CoordinateUnionizer, UnionResult};
pub use value::{AxisRecord, AxisValue, CoordinateType, Level, TimeInterval};
