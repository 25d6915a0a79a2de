//! One record scan over a fixed list of axes.
//!
//! [`CoordinateNd`] forwards every record to each builder, keeps the records,
//! and on [`finish`](CoordinateNd::finish) lays them out in a
//! [`SparseArray`] addressed by their coordinate index tuples. A
//! hierarchical builder contributes two dimensions: the parent axis followed
//! by the union of its child values.

use crate::builder::CoordinateBuilder;
use crate::cancel::CancelToken;
use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use crate::search::AxisSearch;
use crate::sparse::SparseArray;
use crate::value::{AxisRecord, AxisValue, CoordinateType};
use tracing::debug;

/// Default number of records between cancellation checks.
pub const DEFAULT_CHECK_EVERY: usize = 4096;

pub struct CoordinateNd<R> {
    builders: Vec<CoordinateBuilder>,
    records: Vec<R>,
    cancel: Option<CancelToken>,
    check_every: usize,
}

impl<R: AxisRecord> CoordinateNd<R> {
    pub fn new(builders: Vec<CoordinateBuilder>) -> Self {
        Self {
            builders,
            records: Vec::new(),
            cancel: None,
            check_every: DEFAULT_CHECK_EVERY,
        }
    }

    /// One flat ascending builder per type.
    pub fn with_types(types: &[CoordinateType]) -> Self {
        Self::new(types.iter().map(|t| CoordinateBuilder::new(*t)).collect())
    }

    pub fn with_cancel(mut self, token: CancelToken, check_every: usize) -> Self {
        self.cancel = Some(token);
        self.check_every = check_every.max(1);
        self
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn builders(&self) -> &[CoordinateBuilder] {
        &self.builders
    }

    fn check_cancel(&self, n: usize) -> Result<()> {
        match &self.cancel {
            Some(token) if n % self.check_every == 0 => token.check(),
            _ => Ok(()),
        }
    }

    /// Feed a record to every builder. Records are placed in insertion order
    /// at finish time, so a later duplicate wins. A record rejected by any
    /// builder leaves every axis unchanged.
    pub fn add_record(&mut self, record: R) -> Result<()> {
        self.check_cancel(self.records.len())?;
        let extracted = self
            .builders
            .iter()
            .map(|b| b.extract(&record))
            .collect::<Result<Vec<_>>>()?;
        for (builder, values) in self.builders.iter_mut().zip(extracted) {
            builder.insert(values);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn add_records(&mut self, records: impl IntoIterator<Item = R>) -> Result<()> {
        for record in records {
            self.add_record(record)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<CoordinateNdResult<R>> {
        let _span = tracing::debug_span!(
            "coordinate_nd_finish",
            records = self.records.len(),
            axes = self.builders.len()
        )
        .entered();

        let mut coordinates = Vec::new();
        let mut nested = Vec::new();
        for builder in &mut self.builders {
            let finished = builder.finish()?;
            coordinates.push(finished.coordinate.clone());
            if let Some(union) = &finished.child_union {
                nested.push(NestedAxis {
                    parent_axis: coordinates.len() - 1,
                    child_axis: coordinates.len(),
                    children: finished.children.clone(),
                });
                coordinates.push(union.clone());
            }
        }

        let shape: Vec<usize> = coordinates.iter().map(Coordinate::size).collect();
        let mut sparse = SparseArray::new(&shape)?;
        let records = std::mem::take(&mut self.records);
        let mut index = Vec::with_capacity(shape.len());
        for (n, record) in records.into_iter().enumerate() {
            self.check_cancel(n)?;
            index.clear();
            for builder in &self.builders {
                index.push(builder.index_of(&record)?);
                if builder.child_type().is_some() {
                    index.push(builder.child_index_of(&record)?);
                }
            }
            sparse.add(record, &index)?;
        }

        debug!(
            shape = ?shape,
            occupied = sparse.occupied_count(),
            ndups = sparse.duplicate_count(),
            density = sparse.density(),
            "coordinate space built"
        );

        Ok(CoordinateNdResult {
            coordinates,
            nested,
            sparse,
        })
    }
}

/// Per-parent child coordinates of a hierarchical axis.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedAxis {
    pub parent_axis: usize,
    pub child_axis: usize,
    /// Child coordinate for each parent value, in parent order.
    pub children: Vec<Coordinate>,
}

impl NestedAxis {
    pub fn is_orthogonal(&self, union: &Coordinate) -> bool {
        self.children.iter().all(|c| c == union)
    }
}

#[derive(Debug, Clone)]
pub struct CoordinateNdResult<R> {
    /// Axes in stride order; `sparse.shape()[i] == coordinates[i].size()`.
    pub coordinates: Vec<Coordinate>,
    pub nested: Vec<NestedAxis>,
    pub sparse: SparseArray<R>,
}

impl<R> CoordinateNdResult<R> {
    /// Exact index tuple for one value per axis.
    pub fn index_of_values(&self, values: &[AxisValue]) -> Result<Option<Vec<usize>>> {
        if values.len() != self.coordinates.len() {
            return Err(Error::index_out_of_range(format!(
                "{} values for {} axes",
                values.len(),
                self.coordinates.len()
            )));
        }
        Ok(values
            .iter()
            .zip(&self.coordinates)
            .map(|(v, c)| c.index_of(v))
            .collect())
    }

    /// Record at the tuple of values, or `None` when a value is not on its
    /// axis or the cell is empty.
    pub fn fetch_by_values(&self, values: &[AxisValue]) -> Result<Option<&R>> {
        match self.index_of_values(values)? {
            Some(index) => self.sparse.fetch(&index),
            None => Ok(None),
        }
    }

    pub fn search(&self, axis: usize) -> Option<AxisSearch<'_>> {
        self.coordinates.get(axis).map(Coordinate::search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Level;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec {
        id: u32,
        run: i64,
        time: i64,
    }

    impl AxisRecord for Rec {
        fn runtime(&self) -> i64 {
            self.run
        }

        fn time_offset(&self) -> Option<i64> {
            Some(self.time)
        }
    }

    #[test]
    fn test_hierarchical_shape() {
        let mut nd = CoordinateNd::new(vec![CoordinateBuilder::hierarchical(
            CoordinateType::Runtime,
            CoordinateType::Time,
        )]);
        nd.add_record(Rec { id: 0, run: 0, time: 0 }).unwrap();
        nd.add_record(Rec { id: 1, run: 0, time: 6 }).unwrap();
        nd.add_record(Rec { id: 2, run: 10, time: 12 }).unwrap();
        let result = nd.finish().unwrap();
        assert_eq!(result.sparse.shape(), &[2, 3]);
        assert_eq!(result.nested.len(), 1);
        assert_eq!(result.nested[0].child_axis, 1);
        assert!(!result.nested[0].is_orthogonal(&result.coordinates[1]));
        let rec = result
            .fetch_by_values(&[AxisValue::Runtime(10), AxisValue::Time(12)])
            .unwrap()
            .unwrap();
        assert_eq!(rec.id, 2);
        assert_eq!(
            result
                .fetch_by_values(&[AxisValue::Runtime(10), AxisValue::Time(0)])
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_wrong_arity() {
        let mut nd = CoordinateNd::with_types(&[CoordinateType::Runtime]);
        nd.add_record(Rec { id: 0, run: 0, time: 0 }).unwrap();
        let result = nd.finish().unwrap();
        assert!(result
            .fetch_by_values(&[AxisValue::Runtime(0), AxisValue::Time(0)])
            .is_err());
    }

    #[test]
    fn test_rejected_record_leaves_axes_untouched() {
        struct Sounding {
            run: i64,
            level: Option<f64>,
        }

        impl AxisRecord for Sounding {
            fn runtime(&self) -> i64 {
                self.run
            }

            fn level(&self) -> Option<Level> {
                self.level.map(Level::point)
            }
        }

        let mut nd =
            CoordinateNd::with_types(&[CoordinateType::Runtime, CoordinateType::Vertical]);
        let err = nd.add_record(Sounding { run: 5, level: None }).unwrap_err();
        assert!(matches!(err, Error::MissingValue(_)));
        assert_eq!(nd.builders()[0].value_count(), 0);
        assert_eq!(nd.record_count(), 0);

        nd.add_record(Sounding { run: 1, level: Some(500.0) }).unwrap();
        let result = nd.finish().unwrap();
        assert_eq!(result.coordinates[0].values(), &[AxisValue::Runtime(1)]);
        assert_eq!(result.sparse.density(), 1.0);
    }

    #[test]
    fn test_cancelled_build() {
        let token = CancelToken::new();
        let mut nd =
            CoordinateNd::with_types(&[CoordinateType::Time]).with_cancel(token.clone(), 2);
        nd.add_record(Rec { id: 0, run: 0, time: 0 }).unwrap();
        token.cancel();
        nd.add_record(Rec { id: 1, run: 0, time: 1 }).unwrap();
        assert!(matches!(
            nd.add_record(Rec { id: 2, run: 0, time: 2 }),
            Err(Error::Cancelled)
        ));
        assert!(matches!(nd.finish(), Err(Error::Cancelled)));
    }
}
