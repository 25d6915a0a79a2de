//! Distinct-value accumulation for one axis during a record scan.
//!
//! A builder is flat by default. A hierarchical builder keeps one child node
//! per parent value in an arena (node 0 is the root), e.g. the forecast
//! offsets seen under each run time. Finishing yields the parent coordinate,
//! the per-parent child coordinates and the union of all child values.

use crate::coordinate::{AxisOrder, Coordinate};
use crate::error::{Error, Result};
use crate::value::{AxisRecord, AxisValue, CoordinateType};
use rustc_hash::{FxHashMap, FxHashSet};

const ROOT: usize = 0;

#[derive(Debug, Default)]
struct BuilderNode {
    values: FxHashSet<AxisValue>,
    /// Parent value -> arena index of its child node (root only).
    children: FxHashMap<AxisValue, usize>,
}

#[derive(Debug, Clone, Copy)]
struct ChildAxis {
    coord_type: CoordinateType,
    order: AxisOrder,
}

/// Output of [`CoordinateBuilder::finish`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedAxis {
    pub coordinate: Coordinate,
    /// Child coordinate per parent value, in parent coordinate order.
    /// Empty for flat builders.
    pub children: Vec<Coordinate>,
    /// Union of every child value. `None` for flat builders.
    pub child_union: Option<Coordinate>,
}

impl FinishedAxis {
    /// Number of dimensions this axis contributes to an N-d index.
    pub fn rank(&self) -> usize {
        if self.child_union.is_some() {
            2
        } else {
            1
        }
    }

    /// True when every parent value saw the same child values.
    pub fn is_orthogonal(&self) -> bool {
        match &self.child_union {
            Some(union) => self.children.iter().all(|c| c == union),
            None => true,
        }
    }
}

/// One record's validated values for a builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedValue {
    pub value: AxisValue,
    pub child: Option<AxisValue>,
}

/// Accumulates the distinct values of one axis.
#[derive(Debug)]
pub struct CoordinateBuilder {
    coord_type: CoordinateType,
    order: AxisOrder,
    child: Option<ChildAxis>,
    nodes: Vec<BuilderNode>,
    records_seen: usize,
    finished: Option<FinishedAxis>,
}

impl CoordinateBuilder {
    pub fn new(coord_type: CoordinateType) -> Self {
        Self {
            coord_type,
            order: AxisOrder::Ascending,
            child: None,
            nodes: vec![BuilderNode::default()],
            records_seen: 0,
            finished: None,
        }
    }

    /// Builder that also tracks `child_type` values per value of this axis.
    pub fn hierarchical(coord_type: CoordinateType, child_type: CoordinateType) -> Self {
        Self::new(coord_type).with_child(child_type, AxisOrder::Ascending)
    }

    pub fn with_order(mut self, order: AxisOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_child(mut self, child_type: CoordinateType, order: AxisOrder) -> Self {
        self.child = Some(ChildAxis {
            coord_type: child_type,
            order,
        });
        self
    }

    #[inline]
    pub fn coord_type(&self) -> CoordinateType {
        self.coord_type
    }

    pub fn child_type(&self) -> Option<CoordinateType> {
        self.child.map(|c| c.coord_type)
    }

    pub fn records_seen(&self) -> usize {
        self.records_seen
    }

    /// Distinct values accumulated so far on the root axis.
    pub fn value_count(&self) -> usize {
        self.nodes[ROOT].values.len()
    }

    pub fn contains_value(&self, value: &AxisValue) -> bool {
        self.nodes[ROOT].values.contains(value)
    }

    /// Extract this axis' value (and the child value, if hierarchical) from
    /// `record` and record it. Nothing is stored when extraction fails.
    pub fn add_record<R: AxisRecord + ?Sized>(&mut self, record: &R) -> Result<()> {
        let extracted = self.extract(record)?;
        self.insert(extracted);
        Ok(())
    }

    /// Validated values `record` would add, without storing them.
    pub fn extract<R: AxisRecord + ?Sized>(&self, record: &R) -> Result<ExtractedValue> {
        let value = self.coord_type.extract(record)?;
        self.check(self.coord_type, &value)?;
        let child = match self.child {
            Some(child) => {
                let v = child.coord_type.extract(record)?;
                self.check(child.coord_type, &v)?;
                Some(v)
            }
            None => None,
        };
        Ok(ExtractedValue { value, child })
    }

    /// Store values previously returned by [`extract`](Self::extract).
    pub fn insert(&mut self, extracted: ExtractedValue) {
        self.finished = None;
        self.nodes[ROOT].values.insert(extracted.value);
        if let Some(cv) = extracted.child {
            let node = self.child_node(extracted.value);
            self.nodes[node].values.insert(cv);
        }
        self.records_seen += 1;
    }

    pub fn add_value(&mut self, value: AxisValue) -> Result<()> {
        self.check(self.coord_type, &value)?;
        self.finished = None;
        self.nodes[ROOT].values.insert(value);
        Ok(())
    }

    /// Record `child` under `parent` on a hierarchical builder.
    pub fn add_child_value(&mut self, parent: AxisValue, child: AxisValue) -> Result<()> {
        let child_type = self.child_type().ok_or_else(|| {
            Error::invalid_value(format!("{} builder has no child axis", self.coord_type))
        })?;
        self.check(self.coord_type, &parent)?;
        self.check(child_type, &child)?;
        self.finished = None;
        self.nodes[ROOT].values.insert(parent);
        let node = self.child_node(parent);
        self.nodes[node].values.insert(child);
        Ok(())
    }

    /// Add every value of an existing coordinate of the same type.
    pub fn add_all(&mut self, coord: &Coordinate) -> Result<()> {
        if coord.coord_type() != self.coord_type {
            return Err(Error::invalid_value(format!(
                "cannot add {} coordinate to {} builder",
                coord.coord_type(),
                self.coord_type
            )));
        }
        self.finished = None;
        self.nodes[ROOT].values.extend(coord.values().iter().copied());
        Ok(())
    }

    fn check(&self, expected: CoordinateType, value: &AxisValue) -> Result<()> {
        if value.coord_type() != expected {
            return Err(Error::invalid_value(format!(
                "{} value {} on a {} axis",
                value.coord_type(),
                value,
                expected
            )));
        }
        value.validate()
    }

    fn child_node(&mut self, parent: AxisValue) -> usize {
        if let Some(&idx) = self.nodes[ROOT].children.get(&parent) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(BuilderNode::default());
        self.nodes[ROOT].children.insert(parent, idx);
        idx
    }

    /// Sort the accumulated values into immutable coordinates.
    ///
    /// Fails with `EmptyAxis` if nothing was added (or, for a hierarchical
    /// builder, no child value was seen).
    pub fn finish(&mut self) -> Result<&FinishedAxis> {
        if self.finished.is_none() {
            self.finished = Some(self.build_finished()?);
        }
        self.finished
            .as_ref()
            .ok_or_else(|| Error::not_found("finished axis"))
    }

    fn build_finished(&self) -> Result<FinishedAxis> {
        let root = &self.nodes[ROOT];
        if root.values.is_empty() {
            return Err(Error::empty_axis(format!("no {} values", self.coord_type)));
        }
        let coordinate = Coordinate::new(self.coord_type, root.values.iter().copied(), self.order)?;

        let Some(child) = self.child else {
            return Ok(FinishedAxis {
                coordinate,
                children: Vec::new(),
                child_union: None,
            });
        };

        let mut children = Vec::with_capacity(coordinate.size());
        let mut union = FxHashSet::default();
        for value in coordinate.values() {
            let values: Vec<AxisValue> = match root.children.get(value) {
                Some(&node) => self.nodes[node].values.iter().copied().collect(),
                None => Vec::new(),
            };
            union.extend(values.iter().copied());
            children.push(Coordinate::new(child.coord_type, values, child.order)?);
        }
        if union.is_empty() {
            return Err(Error::empty_axis(format!(
                "no {} values under {}",
                child.coord_type, self.coord_type
            )));
        }
        let child_union = Coordinate::new(child.coord_type, union, child.order)?;

        Ok(FinishedAxis {
            coordinate,
            children,
            child_union: Some(child_union),
        })
    }

    pub fn finished(&self) -> Option<&FinishedAxis> {
        self.finished.as_ref()
    }

    pub fn into_finished(self) -> Option<FinishedAxis> {
        self.finished
    }

    /// Position of the record's value in the finished coordinate.
    pub fn index_of<R: AxisRecord + ?Sized>(&self, record: &R) -> Result<usize> {
        let finished = self.require_finished()?;
        let value = self.coord_type.extract(record)?;
        finished.coordinate.index_of(&value).ok_or_else(|| {
            Error::not_found(format!("{} value {} not on axis", self.coord_type, value))
        })
    }

    /// Position of the record's child value in the child union coordinate.
    pub fn child_index_of<R: AxisRecord + ?Sized>(&self, record: &R) -> Result<usize> {
        let finished = self.require_finished()?;
        let (Some(child), Some(union)) = (self.child, finished.child_union.as_ref()) else {
            return Err(Error::not_found(format!(
                "{} builder has no child axis",
                self.coord_type
            )));
        };
        let value = child.coord_type.extract(record)?;
        union.index_of(&value).ok_or_else(|| {
            Error::not_found(format!("{} value {} not on axis", child.coord_type, value))
        })
    }

    fn require_finished(&self) -> Result<&FinishedAxis> {
        self.finished
            .as_ref()
            .ok_or_else(|| Error::not_found(format!("{} builder is not finished", self.coord_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Level;

    struct Rec {
        run: i64,
        time: i64,
        level: Option<f64>,
    }

    impl AxisRecord for Rec {
        fn runtime(&self) -> i64 {
            self.run
        }

        fn time_offset(&self) -> Option<i64> {
            Some(self.time)
        }

        fn level(&self) -> Option<Level> {
            self.level.map(Level::point)
        }
    }

    fn rec(run: i64, time: i64) -> Rec {
        Rec {
            run,
            time,
            level: None,
        }
    }

    #[test]
    fn test_flat_builder() {
        let mut b = CoordinateBuilder::new(CoordinateType::Time);
        for t in [12, 0, 6, 0, 12] {
            b.add_record(&rec(0, t)).unwrap();
        }
        assert_eq!(b.records_seen(), 5);
        let finished = b.finish().unwrap();
        assert_eq!(finished.coordinate.size(), 3);
        assert_eq!(finished.rank(), 1);
        assert_eq!(b.index_of(&rec(0, 6)).unwrap(), 1);
        assert!(matches!(b.index_of(&rec(0, 7)), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_index_of_before_finish() {
        let mut b = CoordinateBuilder::new(CoordinateType::Time);
        b.add_record(&rec(0, 0)).unwrap();
        assert!(matches!(b.index_of(&rec(0, 0)), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_empty_builder() {
        let mut b = CoordinateBuilder::new(CoordinateType::Runtime);
        assert!(matches!(b.finish(), Err(Error::EmptyAxis(_))));
    }

    #[test]
    fn test_missing_value_stores_nothing() {
        let mut b = CoordinateBuilder::new(CoordinateType::Vertical);
        assert!(matches!(
            b.add_record(&rec(0, 0)),
            Err(Error::MissingValue(_))
        ));
        assert_eq!(b.value_count(), 0);
        assert_eq!(b.records_seen(), 0);
    }

    #[test]
    fn test_nan_level_rejected() {
        let mut b = CoordinateBuilder::new(CoordinateType::Vertical);
        let bad = Rec {
            run: 0,
            time: 0,
            level: Some(f64::NAN),
        };
        assert!(matches!(b.add_record(&bad), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_hierarchical_builder() {
        let mut b = CoordinateBuilder::hierarchical(CoordinateType::Runtime, CoordinateType::Time);
        for (run, time) in [(100, 0), (100, 6), (200, 6), (200, 12)] {
            b.add_record(&rec(run, time)).unwrap();
        }
        let finished = b.finish().unwrap().clone();
        assert_eq!(finished.rank(), 2);
        assert_eq!(finished.children.len(), 2);
        assert_eq!(finished.children[0].size(), 2);
        let union = finished.child_union.as_ref().unwrap();
        assert_eq!(union.size(), 3);
        assert!(!finished.is_orthogonal());
        assert_eq!(b.index_of(&rec(200, 12)).unwrap(), 1);
        assert_eq!(b.child_index_of(&rec(200, 12)).unwrap(), 2);
    }

    #[test]
    fn test_add_all_type_mismatch() {
        let coord = Coordinate::new(
            CoordinateType::Time,
            [AxisValue::Time(1)],
            AxisOrder::Ascending,
        )
        .unwrap();
        let mut b = CoordinateBuilder::new(CoordinateType::Runtime);
        assert!(b.add_all(&coord).is_err());
        let mut b = CoordinateBuilder::new(CoordinateType::Time);
        b.add_all(&coord).unwrap();
        assert_eq!(b.value_count(), 1);
    }
}
