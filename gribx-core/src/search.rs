//! Value-to-index resolution on a finished axis.
//!
//! Search works in value space: `Min` asks for the smallest axis value at or
//! above the target, `Max` for the largest at or below it. On descending axes
//! that mirrors the index direction. Interval axes resolve to the cell that
//! contains the target; the mode only matters for targets in a gap.
//!
//! Targets outside the axis extent are not found unless the search is
//! `bounded`, in which case they clamp to the nearer end of the axis.

use crate::coordinate::{Coordinate, Spacing};
use crate::error::{Error, Result};
use crate::value::AxisValue;
use std::ops::RangeInclusive;

/// How a target between two axis values resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchMode {
    /// Smallest value >= target.
    Min,
    /// Largest value <= target.
    Max,
    /// Nearest value; ties go to the lower index.
    #[default]
    Closest,
}

impl std::str::FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(SearchMode::Min),
            "max" => Ok(SearchMode::Max),
            "closest" | "nearest" => Ok(SearchMode::Closest),
            other => Err(Error::invalid_value(format!("unknown search mode '{other}'"))),
        }
    }
}

/// Result of locating a target relative to the axis extent.
enum Placement {
    Inside(usize),
    /// Before index 0 in axis order.
    BeforeFirst,
    /// After the last index in axis order.
    AfterLast,
}

/// Search view over one coordinate. Edge arrays are projected once on
/// construction so repeated lookups do no allocation.
pub struct AxisSearch<'a> {
    coord: &'a Coordinate,
    points: Vec<f64>,
    edges: Vec<f64>,
    pairs: Vec<(f64, f64)>,
}

impl<'a> AxisSearch<'a> {
    pub fn new(coord: &'a Coordinate) -> Self {
        let mut points = Vec::new();
        let mut edges = Vec::new();
        let mut pairs = Vec::new();
        match coord.spacing() {
            Spacing::Regular | Spacing::IrregularPoint => {
                points = coord.values().iter().map(AxisValue::as_f64).collect();
            }
            Spacing::ContiguousInterval => edges = coord.edges(),
            Spacing::DiscontiguousInterval => pairs = coord.edge_pairs(),
        }
        Self {
            coord,
            points,
            edges,
            pairs,
        }
    }

    pub fn coordinate(&self) -> &'a Coordinate {
        self.coord
    }

    /// Index of the cell for `target`, or `None` when it is out of range and
    /// `bounded` is false. A NaN target is never found.
    pub fn find_index(
        &self,
        target: f64,
        mode: SearchMode,
        bounded: bool,
    ) -> Result<Option<usize>> {
        let n = self.coord.size();
        if n == 0 {
            return Err(Error::empty_axis(format!(
                "search on empty {} axis",
                self.coord.coord_type()
            )));
        }
        if target.is_nan() {
            return Ok(None);
        }

        let placement = match self.coord.spacing() {
            Spacing::Regular => self.find_regular(target, mode),
            Spacing::IrregularPoint => self.find_irregular(target, mode),
            Spacing::ContiguousInterval => self.find_contiguous(target),
            Spacing::DiscontiguousInterval => self.find_discontiguous(target, mode),
        };

        Ok(match placement {
            Placement::Inside(idx) => Some(idx),
            Placement::BeforeFirst if bounded => Some(0),
            Placement::AfterLast if bounded => Some(n - 1),
            Placement::BeforeFirst | Placement::AfterLast => None,
        })
    }

    /// Exact match first, then a projected search.
    pub fn find_value(
        &self,
        value: &AxisValue,
        mode: SearchMode,
        bounded: bool,
    ) -> Result<Option<usize>> {
        if let Some(idx) = self.coord.index_of(value) {
            return Ok(Some(idx));
        }
        self.find_index(value.as_f64(), mode, bounded)
    }

    /// Inclusive index range whose values cover `[lo, hi]`.
    ///
    /// `None` when either end is out of range (unbounded) or no value falls
    /// inside the interval.
    pub fn find_range(
        &self,
        lo: f64,
        hi: f64,
        bounded: bool,
    ) -> Result<Option<RangeInclusive<usize>>> {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let first = self.find_index(lo, SearchMode::Min, bounded)?;
        let last = self.find_index(hi, SearchMode::Max, bounded)?;
        let (Some(a), Some(b)) = (first, last) else {
            return Ok(None);
        };
        let (start, end) = (a.min(b), a.max(b));
        // Min(lo) past Max(hi) in value space means no value lies in [lo, hi].
        let empty = if self.coord.is_ascending() { a > b } else { a < b };
        if empty {
            return Ok(None);
        }
        Ok(Some(start..=end))
    }

    // ========================================================================
    // Regular
    // ========================================================================

    /// Closed form over `start + i * step`, settled against the stored
    /// values so rounding in the division cannot skip a value on the axis.
    /// The axis extent covers one full step past the last value, so `4.9` on
    /// `{0..4}` is still index 4 for `Max`.
    fn find_regular(&self, target: f64, mode: SearchMode) -> Placement {
        let pts = &self.points;
        let n = pts.len();
        let step = pts[1] - pts[0];
        let k = (target - pts[0]) / step;
        if k < 0.0 {
            return Placement::BeforeFirst;
        }
        if k >= n as f64 {
            return Placement::AfterLast;
        }

        let ascending = step > 0.0;
        // value i is at or before the target in index order
        let reached = |i: usize| if ascending { pts[i] <= target } else { pts[i] >= target };
        let mut lo = (k.floor() as usize).min(n - 1);
        while lo > 0 && !reached(lo) {
            lo -= 1;
        }
        while lo + 1 < n && reached(lo + 1) {
            lo += 1;
        }
        if !reached(lo) {
            return Placement::BeforeFirst;
        }
        if pts[lo] == target {
            return Placement::Inside(lo);
        }

        let next = lo + 1;
        match mode {
            SearchMode::Closest => {
                if next < n && (pts[next] - target).abs() < (target - pts[lo]).abs() {
                    Placement::Inside(next)
                } else {
                    Placement::Inside(lo)
                }
            }
            // lo holds the largest value <= target on ascending axes and the
            // smallest value >= target on descending ones
            SearchMode::Max if ascending => Placement::Inside(lo),
            SearchMode::Min if !ascending => Placement::Inside(lo),
            SearchMode::Min | SearchMode::Max if next < n => Placement::Inside(next),
            SearchMode::Min | SearchMode::Max => Placement::AfterLast,
        }
    }

    // ========================================================================
    // Irregular points
    // ========================================================================

    fn find_irregular(&self, target: f64, mode: SearchMode) -> Placement {
        let pts = &self.points;
        let n = pts.len();
        let ascending = self.coord.is_ascending();
        let (first, last) = (pts[0], pts[n - 1]);

        if ascending {
            if target < first {
                return Placement::BeforeFirst;
            }
            if target > last {
                return Placement::AfterLast;
            }
        } else {
            if target > first {
                return Placement::BeforeFirst;
            }
            if target < last {
                return Placement::AfterLast;
            }
        }
        if target == first {
            return Placement::Inside(0);
        }
        if target == last {
            return Placement::Inside(n - 1);
        }

        // pts[low] and pts[high] bracket the target strictly
        let mut low = 0usize;
        let mut high = n - 1;
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            let v = pts[mid];
            if v == target {
                return Placement::Inside(mid);
            }
            if (v < target) == ascending {
                low = mid;
            } else {
                high = mid;
            }
        }

        // In value space: lower neighbour is low on ascending axes.
        let (below, above) = if ascending { (low, high) } else { (high, low) };
        let idx = match mode {
            SearchMode::Min => above,
            SearchMode::Max => below,
            SearchMode::Closest => {
                let d_low = (target - pts[low]).abs();
                let d_high = (pts[high] - target).abs();
                if d_high < d_low {
                    high
                } else {
                    low
                }
            }
        };
        Placement::Inside(idx)
    }

    // ========================================================================
    // Contiguous intervals
    // ========================================================================

    fn find_contiguous(&self, target: f64) -> Placement {
        let edges = &self.edges;
        let n = edges.len() - 1;
        let ascending = self.coord.is_ascending();
        let (first, last) = (edges[0], edges[n]);

        if ascending {
            if target < first {
                return Placement::BeforeFirst;
            }
            if target > last {
                return Placement::AfterLast;
            }
        } else {
            if target > first {
                return Placement::BeforeFirst;
            }
            if target < last {
                return Placement::AfterLast;
            }
        }

        let mut low = 0usize;
        let mut high = n;
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            let e = edges[mid];
            if e == target {
                return Placement::Inside(mid.min(n - 1));
            }
            let past = if ascending { e < target } else { e > target };
            if past {
                low = mid;
            } else {
                high = mid;
            }
        }
        if ascending {
            Placement::Inside(low)
        } else {
            Placement::Inside(high - 1)
        }
    }

    // ========================================================================
    // Discontiguous intervals
    // ========================================================================

    fn find_discontiguous(&self, target: f64, mode: SearchMode) -> Placement {
        let pairs = &self.pairs;
        let n = pairs.len();
        let ascending = self.coord.is_ascending();

        let (lo_extent, hi_extent) = pairs.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &(a, b)| (lo.min(a.min(b)), hi.max(a.max(b))),
        );
        if target < lo_extent {
            return if ascending {
                Placement::BeforeFirst
            } else {
                Placement::AfterLast
            };
        }
        if target > hi_extent {
            return if ascending {
                Placement::AfterLast
            } else {
                Placement::BeforeFirst
            };
        }

        // After the loop `next` is the first cell past the target in axis order.
        let mut low = 0usize;
        let mut high = n;
        while low < high {
            let mid = low + (high - low) / 2;
            let (a, b) = pairs[mid];
            if contains(a, b, target) {
                return Placement::Inside(mid);
            }
            let before_cell = if ascending { target < a } else { target > a };
            if before_cell {
                high = mid;
            } else {
                low = mid + 1;
            }
        }

        // Overlapping cells can hide a hit from the bisection.
        if let Some(idx) = pairs.iter().position(|&(a, b)| contains(a, b, target)) {
            return Placement::Inside(idx);
        }

        let next = low.min(n - 1);
        let prev = low.saturating_sub(1);
        let (lower_cell, upper_cell) = if ascending { (prev, next) } else { (next, prev) };
        let idx = match mode {
            SearchMode::Min => upper_cell,
            SearchMode::Max => lower_cell,
            SearchMode::Closest => {
                let (pa, pb) = pairs[prev];
                let (na, nb) = pairs[next];
                let d_prev = (target - pa).abs().min((target - pb).abs());
                let d_next = (target - na).abs().min((target - nb).abs());
                if d_next < d_prev {
                    next
                } else {
                    prev
                }
            }
        };
        Placement::Inside(idx)
    }
}

#[inline]
fn contains(a: f64, b: f64, target: f64) -> bool {
    a.min(b) <= target && target <= a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::AxisOrder;
    use crate::value::{CoordinateType, Level, TimeInterval};

    fn time_axis(vals: &[i64], order: AxisOrder) -> Coordinate {
        Coordinate::new(
            CoordinateType::Time,
            vals.iter().map(|v| AxisValue::Time(*v)),
            order,
        )
        .unwrap()
    }

    fn interval_axis(cells: &[(i64, i64)], order: AxisOrder) -> Coordinate {
        Coordinate::new(
            CoordinateType::TimeInterval,
            cells
                .iter()
                .map(|(a, b)| AxisValue::TimeInterval(TimeInterval::new(*a, *b))),
            order,
        )
        .unwrap()
    }

    #[test]
    fn test_regular_modes() {
        let c = time_axis(&[0, 1, 2, 3, 4], AxisOrder::Ascending);
        let s = c.search();
        assert_eq!(s.find_index(0.0, SearchMode::Min, false).unwrap(), Some(0));
        assert_eq!(s.find_index(4.9, SearchMode::Max, false).unwrap(), Some(4));
        assert_eq!(s.find_index(5.5, SearchMode::Min, false).unwrap(), None);
        assert_eq!(s.find_index(5.5, SearchMode::Min, true).unwrap(), Some(4));
        assert_eq!(s.find_index(2.5, SearchMode::Min, false).unwrap(), Some(3));
        assert_eq!(s.find_index(2.5, SearchMode::Max, false).unwrap(), Some(2));
        assert_eq!(s.find_index(2.5, SearchMode::Closest, false).unwrap(), Some(2));
        assert_eq!(s.find_index(2.6, SearchMode::Closest, false).unwrap(), Some(3));
        assert_eq!(s.find_index(-1.0, SearchMode::Max, false).unwrap(), None);
        assert_eq!(s.find_index(-1.0, SearchMode::Max, true).unwrap(), Some(0));
    }

    #[test]
    fn test_regular_descending() {
        let c = time_axis(&[0, 10, 20, 30], AxisOrder::Descending);
        let s = c.search();
        // values: 30, 20, 10, 0
        assert_eq!(s.find_index(15.0, SearchMode::Min, false).unwrap(), Some(1));
        assert_eq!(s.find_index(15.0, SearchMode::Max, false).unwrap(), Some(2));
        assert_eq!(s.find_index(20.0, SearchMode::Max, false).unwrap(), Some(1));
    }

    #[test]
    fn test_regular_descending_boundaries() {
        let c = time_axis(&[0, 10, 20, 30], AxisOrder::Descending);
        assert_eq!(c.spacing(), Spacing::Regular);
        let s = c.search();
        // values: 30, 20, 10, 0
        for mode in [SearchMode::Min, SearchMode::Max, SearchMode::Closest] {
            assert_eq!(s.find_index(30.0, mode, false).unwrap(), Some(0));
            assert_eq!(s.find_index(0.0, mode, false).unwrap(), Some(3));
        }
        assert_eq!(s.find_index(31.0, SearchMode::Max, false).unwrap(), None);
        assert_eq!(s.find_index(31.0, SearchMode::Max, true).unwrap(), Some(0));
        assert_eq!(s.find_index(-5.0, SearchMode::Min, false).unwrap(), Some(3));
        assert_eq!(s.find_index(-5.0, SearchMode::Max, false).unwrap(), None);
        assert_eq!(s.find_index(-5.0, SearchMode::Max, true).unwrap(), Some(3));
    }

    #[test]
    fn test_large_integer_steps_need_exact_spacing() {
        let c = time_axis(&[0, 1_000_000_000_000, 2_000_000_000_500], AxisOrder::Ascending);
        assert_eq!(c.spacing(), Spacing::IrregularPoint);
        let s = c.search();
        assert_eq!(
            s.find_index(2_000_000_000_500.0, SearchMode::Min, false).unwrap(),
            Some(2)
        );
        assert_eq!(
            s.find_index(2_000_000_000_500.0, SearchMode::Max, false).unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_level_step_rounding() {
        let c = Coordinate::new(
            CoordinateType::Vertical,
            [0.1, 0.2, 0.3]
                .iter()
                .map(|v| AxisValue::Vertical(Level::point(*v))),
            AxisOrder::Ascending,
        )
        .unwrap();
        assert_eq!(c.spacing(), Spacing::Regular);
        let s = c.search();
        // (0.3 - 0.1) / 0.1 falls just short of 2
        assert_eq!(s.find_index(0.3, SearchMode::Max, false).unwrap(), Some(2));
        assert_eq!(s.find_index(0.3, SearchMode::Min, false).unwrap(), Some(2));
        assert_eq!(s.find_index(0.2, SearchMode::Max, false).unwrap(), Some(1));
    }

    #[test]
    fn test_irregular_points() {
        let c = time_axis(&[0, 3, 12, 48], AxisOrder::Ascending);
        assert_eq!(c.spacing(), Spacing::IrregularPoint);
        let s = c.search();
        assert_eq!(s.find_index(12.0, SearchMode::Min, false).unwrap(), Some(2));
        assert_eq!(s.find_index(5.0, SearchMode::Min, false).unwrap(), Some(2));
        assert_eq!(s.find_index(5.0, SearchMode::Max, false).unwrap(), Some(1));
        assert_eq!(s.find_index(5.0, SearchMode::Closest, false).unwrap(), Some(1));
        assert_eq!(s.find_index(30.0, SearchMode::Closest, false).unwrap(), Some(2));
        assert_eq!(s.find_index(48.0, SearchMode::Min, false).unwrap(), Some(3));
        assert_eq!(s.find_index(49.0, SearchMode::Max, false).unwrap(), None);
        assert_eq!(s.find_index(49.0, SearchMode::Max, true).unwrap(), Some(3));
    }

    #[test]
    fn test_irregular_descending_levels() {
        let c = Coordinate::new(
            CoordinateType::Vertical,
            [1000.0, 850.0, 500.0, 200.0]
                .iter()
                .map(|v| AxisValue::Vertical(Level::point(*v))),
            AxisOrder::Descending,
        )
        .unwrap();
        let s = c.search();
        assert_eq!(s.find_index(700.0, SearchMode::Min, false).unwrap(), Some(1));
        assert_eq!(s.find_index(700.0, SearchMode::Max, false).unwrap(), Some(2));
        assert_eq!(s.find_index(1100.0, SearchMode::Max, true).unwrap(), Some(0));
        assert_eq!(s.find_index(100.0, SearchMode::Max, true).unwrap(), Some(3));
    }

    #[test]
    fn test_irregular_descending_boundaries() {
        let c = Coordinate::new(
            CoordinateType::Vertical,
            [1000.0, 850.0, 500.0, 200.0]
                .iter()
                .map(|v| AxisValue::Vertical(Level::point(*v))),
            AxisOrder::Descending,
        )
        .unwrap();
        let s = c.search();
        for mode in [SearchMode::Min, SearchMode::Max] {
            assert_eq!(s.find_index(1000.0, mode, false).unwrap(), Some(0));
            assert_eq!(s.find_index(850.0, mode, false).unwrap(), Some(1));
            assert_eq!(s.find_index(200.0, mode, false).unwrap(), Some(3));
        }
        assert_eq!(s.find_index(1000.5, SearchMode::Min, false).unwrap(), None);
        assert_eq!(s.find_index(150.0, SearchMode::Max, false).unwrap(), None);
        assert_eq!(s.find_index(150.0, SearchMode::Min, true).unwrap(), Some(3));
    }

    #[test]
    fn test_single_point_axis() {
        let c = time_axis(&[6], AxisOrder::Ascending);
        let s = c.search();
        assert_eq!(s.find_index(6.0, SearchMode::Closest, false).unwrap(), Some(0));
        assert_eq!(s.find_index(7.0, SearchMode::Closest, false).unwrap(), None);
        assert_eq!(s.find_index(7.0, SearchMode::Closest, true).unwrap(), Some(0));
    }

    #[test]
    fn test_contiguous_edges() {
        let c = interval_axis(&[(10, 20), (20, 30), (30, 40)], AxisOrder::Ascending);
        let s = c.search();
        assert_eq!(s.find_index(25.0, SearchMode::Closest, false).unwrap(), Some(1));
        assert_eq!(s.find_index(10.0, SearchMode::Closest, false).unwrap(), Some(0));
        assert_eq!(s.find_index(20.0, SearchMode::Closest, false).unwrap(), Some(1));
        assert_eq!(s.find_index(40.0, SearchMode::Closest, false).unwrap(), Some(2));
        assert_eq!(s.find_index(41.0, SearchMode::Closest, false).unwrap(), None);
        assert_eq!(s.find_index(41.0, SearchMode::Closest, true).unwrap(), Some(2));
    }

    #[test]
    fn test_contiguous_descending() {
        let c = interval_axis(&[(10, 20), (20, 30), (30, 40)], AxisOrder::Descending);
        let s = c.search();
        // cells: (30,40), (20,30), (10,20); edges 40, 30, 20, 10
        assert_eq!(s.find_index(40.0, SearchMode::Closest, false).unwrap(), Some(0));
        assert_eq!(s.find_index(25.0, SearchMode::Closest, false).unwrap(), Some(1));
        assert_eq!(s.find_index(10.0, SearchMode::Closest, false).unwrap(), Some(2));
        assert_eq!(s.find_index(5.0, SearchMode::Closest, false).unwrap(), None);
    }

    #[test]
    fn test_discontiguous_gaps() {
        let c = interval_axis(&[(0, 3), (6, 9), (12, 15)], AxisOrder::Ascending);
        assert_eq!(c.spacing(), Spacing::DiscontiguousInterval);
        let s = c.search();
        assert_eq!(s.find_index(7.0, SearchMode::Closest, false).unwrap(), Some(1));
        assert_eq!(s.find_index(3.0, SearchMode::Closest, false).unwrap(), Some(0));
        assert_eq!(s.find_index(4.0, SearchMode::Min, false).unwrap(), Some(1));
        assert_eq!(s.find_index(4.0, SearchMode::Max, false).unwrap(), Some(0));
        assert_eq!(s.find_index(4.0, SearchMode::Closest, false).unwrap(), Some(0));
        assert_eq!(s.find_index(5.5, SearchMode::Closest, false).unwrap(), Some(1));
        assert_eq!(s.find_index(16.0, SearchMode::Closest, false).unwrap(), None);
    }

    #[test]
    fn test_discontiguous_descending_gaps() {
        let c = interval_axis(&[(0, 3), (6, 9), (12, 15)], AxisOrder::Descending);
        assert_eq!(c.spacing(), Spacing::DiscontiguousInterval);
        let s = c.search();
        // cells: (12,15), (6,9), (0,3)
        assert_eq!(s.find_index(15.0, SearchMode::Closest, false).unwrap(), Some(0));
        assert_eq!(s.find_index(3.0, SearchMode::Closest, false).unwrap(), Some(2));
        assert_eq!(s.find_index(0.0, SearchMode::Closest, false).unwrap(), Some(2));

        assert_eq!(s.find_index(10.0, SearchMode::Min, false).unwrap(), Some(0));
        assert_eq!(s.find_index(10.0, SearchMode::Max, false).unwrap(), Some(1));
        assert_eq!(s.find_index(10.0, SearchMode::Closest, false).unwrap(), Some(1));
        assert_eq!(s.find_index(11.0, SearchMode::Closest, false).unwrap(), Some(0));
        assert_eq!(s.find_index(10.5, SearchMode::Closest, false).unwrap(), Some(0));

        assert_eq!(s.find_index(4.5, SearchMode::Min, false).unwrap(), Some(1));
        assert_eq!(s.find_index(4.5, SearchMode::Max, false).unwrap(), Some(2));
        assert_eq!(s.find_index(4.5, SearchMode::Closest, false).unwrap(), Some(1));

        assert_eq!(s.find_index(16.0, SearchMode::Closest, false).unwrap(), None);
        assert_eq!(s.find_index(16.0, SearchMode::Closest, true).unwrap(), Some(0));
        assert_eq!(s.find_index(-1.0, SearchMode::Closest, true).unwrap(), Some(2));
    }

    #[test]
    fn test_discontiguous_overlap_found() {
        let c = interval_axis(&[(0, 24), (6, 9), (12, 15)], AxisOrder::Ascending);
        let s = c.search();
        assert_eq!(s.find_index(20.0, SearchMode::Closest, false).unwrap(), Some(0));
    }

    #[test]
    fn test_range() {
        let c = time_axis(&[0, 3, 12, 48], AxisOrder::Ascending);
        let s = c.search();
        assert_eq!(s.find_range(1.0, 20.0, false).unwrap(), Some(1..=2));
        assert_eq!(s.find_range(4.0, 5.0, false).unwrap(), None);
        assert_eq!(s.find_range(-5.0, 100.0, true).unwrap(), Some(0..=3));
        assert_eq!(s.find_range(-5.0, 100.0, false).unwrap(), None);
    }

    #[test]
    fn test_empty_axis_and_nan() {
        let empty =
            Coordinate::new(CoordinateType::Time, Vec::new(), AxisOrder::Ascending).unwrap();
        assert!(matches!(
            empty.search().find_index(1.0, SearchMode::Min, true),
            Err(Error::EmptyAxis(_))
        ));
        let c = time_axis(&[0, 1], AxisOrder::Ascending);
        assert_eq!(c.search().find_index(f64::NAN, SearchMode::Min, true).unwrap(), None);
    }
}
