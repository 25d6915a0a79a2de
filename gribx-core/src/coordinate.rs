//! Immutable axis coordinates.
//!
//! A [`Coordinate`] is the finished, sorted, de-duplicated value list of one
//! axis. Its [`Spacing`] is derived from the values when it is built and
//! selects the search algorithm used by [`AxisSearch`].

use crate::error::{Error, Result};
use crate::search::AxisSearch;
use crate::value::{AxisValue, CoordinateType};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Relative tolerance when testing floating point steps for regularity.
const REGULAR_TOLERANCE: f64 = 1e-9;

/// Structural pattern of an axis' values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spacing {
    /// Points with a constant step.
    Regular,
    /// Points with varying steps (also any single point).
    IrregularPoint,
    /// Cells where each upper edge is the next cell's lower edge.
    ContiguousInterval,
    /// Cells with gaps or overlaps between them.
    DiscontiguousInterval,
}

impl Spacing {
    pub fn is_interval(self) -> bool {
        matches!(
            self,
            Spacing::ContiguousInterval | Spacing::DiscontiguousInterval
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Spacing::Regular => "regular",
            Spacing::IrregularPoint => "irregularPoint",
            Spacing::ContiguousInterval => "contiguousInterval",
            Spacing::DiscontiguousInterval => "discontiguousInterval",
        }
    }
}

/// Sort direction of a finished axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AxisOrder {
    #[default]
    Ascending,
    Descending,
}

// ============================================================================
// Coordinate
// ============================================================================

/// Finished axis: type tag, spacing, direction and distinct sorted values.
///
/// Equality and hashing are structural over `(type, direction, values)`;
/// spacing is a function of those and is not compared separately.
#[derive(Debug, Clone)]
pub struct Coordinate {
    coord_type: CoordinateType,
    spacing: Spacing,
    ascending: bool,
    values: Vec<AxisValue>,
}

impl Coordinate {
    /// Build a coordinate from unsorted values, removing duplicates.
    ///
    /// Fails with `InvalidValue` for NaN levels, values of another axis type,
    /// or a vertical axis that mixes points and layers.
    pub fn new(
        coord_type: CoordinateType,
        values: impl IntoIterator<Item = AxisValue>,
        order: AxisOrder,
    ) -> Result<Self> {
        let mut values: Vec<AxisValue> = values.into_iter().collect();
        for v in &values {
            check_value(coord_type, v)?;
        }
        values.sort_unstable();
        values.dedup();
        let ascending = order == AxisOrder::Ascending;
        if !ascending {
            values.reverse();
        }
        let spacing = compute_spacing(&values, ascending)?;
        Ok(Self {
            coord_type,
            spacing,
            ascending,
            values,
        })
    }

    /// Build a coordinate from values that must already be strictly monotonic
    /// in the given direction (the decode path).
    pub fn from_sorted(
        coord_type: CoordinateType,
        values: Vec<AxisValue>,
        ascending: bool,
    ) -> Result<Self> {
        for v in &values {
            check_value(coord_type, v)?;
        }
        let monotonic = values.windows(2).all(|w| {
            if ascending {
                w[0] < w[1]
            } else {
                w[0] > w[1]
            }
        });
        if !monotonic {
            return Err(Error::invalid_value(format!(
                "{} values are not strictly {}",
                coord_type,
                if ascending { "ascending" } else { "descending" }
            )));
        }
        let spacing = compute_spacing(&values, ascending)?;
        Ok(Self {
            coord_type,
            spacing,
            ascending,
            values,
        })
    }

    #[inline]
    pub fn coord_type(&self) -> CoordinateType {
        self.coord_type
    }

    #[inline]
    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    #[inline]
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn order(&self) -> AxisOrder {
        if self.ascending {
            AxisOrder::Ascending
        } else {
            AxisOrder::Descending
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[AxisValue] {
        &self.values
    }

    pub fn value(&self, idx: usize) -> Option<&AxisValue> {
        self.values.get(idx)
    }

    /// Exact position of `value`, or `None` when it is not on this axis.
    pub fn index_of(&self, value: &AxisValue) -> Option<usize> {
        if self.ascending {
            self.values.binary_search(value).ok()
        } else {
            self.values.binary_search_by(|probe| value.cmp(probe)).ok()
        }
    }

    pub fn contains(&self, value: &AxisValue) -> bool {
        self.index_of(value).is_some()
    }

    /// Search helper for value-to-index resolution on this axis.
    pub fn search(&self) -> AxisSearch<'_> {
        AxisSearch::new(self)
    }

    /// First value and step of a regular axis.
    pub fn regular_params(&self) -> Option<(f64, f64)> {
        if self.spacing != Spacing::Regular {
            return None;
        }
        let start = self.values[0].as_f64();
        Some((start, self.values[1].as_f64() - start))
    }

    /// Cell edges of a contiguous interval axis, in axis order (`size + 1`
    /// values). Point axes return their own values.
    pub fn edges(&self) -> Vec<f64> {
        match self.spacing {
            Spacing::ContiguousInterval => {
                let mut edges = Vec::with_capacity(self.values.len() + 1);
                for v in &self.values {
                    edges.push(self.near_edge(v));
                }
                if let Some(last) = self.values.last() {
                    edges.push(self.far_edge(last));
                }
                edges
            }
            Spacing::DiscontiguousInterval => self
                .edge_pairs()
                .into_iter()
                .flat_map(|(a, b)| [a, b])
                .collect(),
            Spacing::Regular | Spacing::IrregularPoint => {
                self.values.iter().map(AxisValue::as_f64).collect()
            }
        }
    }

    /// `(edge1, edge2)` per cell, oriented so that `edge1` comes first in
    /// axis order.
    pub fn edge_pairs(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .map(|v| (self.near_edge(v), self.far_edge(v)))
            .collect()
    }

    fn near_edge(&self, v: &AxisValue) -> f64 {
        let (a, b) = v.bounds();
        if self.ascending {
            a.min(b)
        } else {
            a.max(b)
        }
    }

    fn far_edge(&self, v: &AxisValue) -> f64 {
        let (a, b) = v.bounds();
        if self.ascending {
            a.max(b)
        } else {
            a.min(b)
        }
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.coord_type == other.coord_type
            && self.ascending == other.ascending
            && self.values == other.values
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord_type.hash(state);
        self.ascending.hash(state);
        self.values.hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} n={} [",
            self.coord_type,
            self.spacing.name(),
            self.values.len()
        )?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

fn check_value(coord_type: CoordinateType, value: &AxisValue) -> Result<()> {
    if value.coord_type() != coord_type {
        return Err(Error::invalid_value(format!(
            "{} value {} on a {} axis",
            value.coord_type(),
            value,
            coord_type
        )));
    }
    value.validate()
}

/// Integer-valued axes need an exact step to be regular.
fn exact_integer(value: &AxisValue) -> Option<i64> {
    match value {
        AxisValue::Runtime(v) | AxisValue::Time(v) => Some(*v),
        AxisValue::Ensemble(m) => Some(i64::from(*m)),
        AxisValue::TimeInterval(_) | AxisValue::Vertical(_) => None,
    }
}

fn compute_spacing(values: &[AxisValue], ascending: bool) -> Result<Spacing> {
    let intervals = values.iter().filter(|v| v.is_interval()).count();
    if intervals != 0 && intervals != values.len() {
        return Err(Error::invalid_value(
            "axis mixes point levels and layers",
        ));
    }

    if intervals > 0 {
        let contiguous = values.windows(2).all(|w| {
            let (a0, a1) = w[0].bounds();
            let (b0, b1) = w[1].bounds();
            if ascending {
                a0.max(a1) == b0.min(b1)
            } else {
                a0.min(a1) == b0.max(b1)
            }
        });
        return Ok(if contiguous {
            Spacing::ContiguousInterval
        } else {
            Spacing::DiscontiguousInterval
        });
    }

    if values.len() < 2 {
        return Ok(Spacing::IrregularPoint);
    }
    let regular = match values.iter().map(exact_integer).collect::<Option<Vec<_>>>() {
        Some(ints) => {
            let step = ints[1].checked_sub(ints[0]);
            step.is_some() && ints.windows(2).all(|w| w[1].checked_sub(w[0]) == step)
        }
        None => {
            let step = values[1].as_f64() - values[0].as_f64();
            values.windows(2).all(|w| {
                let d = w[1].as_f64() - w[0].as_f64();
                (d - step).abs() <= step.abs() * REGULAR_TOLERANCE
            })
        }
    };
    Ok(if regular {
        Spacing::Regular
    } else {
        Spacing::IrregularPoint
    })
}
