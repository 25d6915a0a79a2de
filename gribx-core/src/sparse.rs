//! Dense-addressed, sparsely populated lookup table.
//!
//! Every cell of the Cartesian product of the axis sizes has a `u32` slot in
//! `track`: `0` means empty, otherwise the 1-based position of the record in
//! `content`. Lookups are O(1); construction is O(total slots).
//!
//! ```text
//! shape   [2, 3]           strides [3, 1]
//! track   [1, 2, 0, 3, 0, 4]
//! content [r0, r1, r2, r3]
//! ```

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SparseArray<T> {
    shape: Vec<usize>,
    strides: Vec<usize>,
    track: Vec<u32>,
    content: Vec<T>,
    ndups: usize,
    occupied: usize,
}

impl<T> SparseArray<T> {
    /// Allocate an empty array. Fails with `InvalidShape` for an empty shape,
    /// a zero-sized axis, or more cells than a `u32` slot can address.
    pub fn new(shape: &[usize]) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::invalid_shape("rank 0"));
        }
        if let Some(axis) = shape.iter().position(|&s| s == 0) {
            return Err(Error::invalid_shape(format!("axis {axis} has size 0 in {shape:?}")));
        }
        let total = shape
            .iter()
            .try_fold(1usize, |acc, &s| acc.checked_mul(s))
            .filter(|&t| t <= u32::MAX as usize)
            .ok_or_else(|| Error::invalid_shape(format!("{shape:?} exceeds u32 slot addressing")))?;

        let mut strides = vec![1usize; shape.len()];
        for i in (0..shape.len() - 1).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }

        Ok(Self {
            shape: shape.to_vec(),
            strides,
            track: vec![0; total],
            content: Vec::new(),
            ndups: 0,
            occupied: 0,
        })
    }

    /// Rebuild from a persisted occupancy list. Flat indices must be strictly
    /// increasing and inside the shape.
    pub fn from_occupied(
        shape: &[usize],
        entries: impl IntoIterator<Item = (usize, T)>,
        ndups: usize,
    ) -> Result<Self> {
        let mut array = Self::new(shape)?;
        let mut prev: Option<usize> = None;
        for (flat, value) in entries {
            if flat >= array.track.len() {
                return Err(Error::index_out_of_range(format!(
                    "flat index {flat} >= {}",
                    array.track.len()
                )));
            }
            if prev.is_some_and(|p| flat <= p) {
                return Err(Error::index_out_of_range(format!(
                    "flat index {flat} not increasing"
                )));
            }
            prev = Some(flat);
            array.content.push(value);
            array.track[flat] = array.content.len() as u32;
            array.occupied += 1;
        }
        array.ndups = ndups;
        Ok(array)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn total_slots(&self) -> usize {
        self.track.len()
    }

    /// Adds that replaced an already occupied slot.
    pub fn duplicate_count(&self) -> usize {
        self.ndups
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    /// Records stored, including ones shadowed by a later duplicate.
    pub fn record_count(&self) -> usize {
        self.content.len()
    }

    pub fn density(&self) -> f64 {
        self.occupied as f64 / self.track.len() as f64
    }

    /// Row-major flat position of an index tuple.
    pub fn flat_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.shape.len() {
            return Err(Error::index_out_of_range(format!(
                "rank {} index for rank {} array",
                index.len(),
                self.shape.len()
            )));
        }
        let mut flat = 0;
        for (axis, (&i, &size)) in index.iter().zip(&self.shape).enumerate() {
            if i >= size {
                return Err(Error::index_out_of_range(format!(
                    "index {i} on axis {axis} of size {size}"
                )));
            }
            flat += i * self.strides[axis];
        }
        Ok(flat)
    }

    /// Inverse of [`flat_index`](Self::flat_index).
    pub fn unravel(&self, mut flat: usize) -> Vec<usize> {
        self.strides
            .iter()
            .map(|&stride| {
                let i = flat / stride;
                flat %= stride;
                i
            })
            .collect()
    }

    /// Store `value` at `index`. A later add to the same cell wins.
    pub fn add(&mut self, value: T, index: &[usize]) -> Result<()> {
        let flat = self.flat_index(index)?;
        if self.content.len() >= u32::MAX as usize {
            return Err(Error::invalid_shape("record store exceeds u32 slot addressing"));
        }
        self.content.push(value);
        let slot = &mut self.track[flat];
        if *slot == 0 {
            self.occupied += 1;
        } else {
            self.ndups += 1;
        }
        *slot = self.content.len() as u32;
        Ok(())
    }

    pub fn fetch(&self, index: &[usize]) -> Result<Option<&T>> {
        let flat = self.flat_index(index)?;
        Ok(self.fetch_flat(flat))
    }

    pub fn fetch_flat(&self, flat: usize) -> Option<&T> {
        match self.track.get(flat) {
            Some(&slot) if slot != 0 => self.content.get(slot as usize - 1),
            _ => None,
        }
    }

    /// Occupied cells in flat order as `(flat, index tuple, record)`.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (usize, Vec<usize>, &T)> + '_ {
        self.track
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot != 0)
            .map(move |(flat, &slot)| (flat, self.unravel(flat), &self.content[slot as usize - 1]))
    }

    /// Drop records shadowed by a duplicate; content is left in flat order.
    pub fn compact(self) -> Self {
        self.map(|v| v)
    }

    /// Convert the stored handles, keeping occupancy and duplicate count.
    /// Records shadowed by a duplicate are dropped.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> SparseArray<U> {
        let mut content: Vec<Option<T>> = self.content.into_iter().map(Some).collect();
        let mut mapped = Vec::with_capacity(self.occupied);
        let mut track = self.track;
        for slot in track.iter_mut().filter(|s| **s != 0) {
            if let Some(value) = content[*slot as usize - 1].take() {
                mapped.push(f(value));
            }
            *slot = mapped.len() as u32;
        }
        SparseArray {
            shape: self.shape,
            strides: self.strides,
            track,
            content: mapped,
            ndups: self.ndups,
            occupied: self.occupied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_shapes() {
        assert!(matches!(SparseArray::<u8>::new(&[]), Err(Error::InvalidShape(_))));
        assert!(matches!(SparseArray::<u8>::new(&[3, 0]), Err(Error::InvalidShape(_))));
        assert!(matches!(
            SparseArray::<u8>::new(&[1 << 20, 1 << 20]),
            Err(Error::InvalidShape(_))
        ));
    }

    #[test]
    fn test_add_fetch_and_bounds() {
        let mut a = SparseArray::new(&[2, 3]).unwrap();
        a.add("x", &[1, 2]).unwrap();
        assert_eq!(a.fetch(&[1, 2]).unwrap(), Some(&"x"));
        assert_eq!(a.fetch(&[0, 0]).unwrap(), None);
        assert!(matches!(a.fetch(&[2, 0]), Err(Error::IndexOutOfRange(_))));
        assert!(matches!(a.add("y", &[0]), Err(Error::IndexOutOfRange(_))));
        assert_eq!(a.flat_index(&[1, 2]).unwrap(), 5);
        assert_eq!(a.unravel(5), vec![1, 2]);
    }

    #[test]
    fn test_last_write_wins() {
        let mut a = SparseArray::new(&[2]).unwrap();
        a.add(1, &[0]).unwrap();
        a.add(2, &[0]).unwrap();
        assert_eq!(a.fetch(&[0]).unwrap(), Some(&2));
        assert_eq!(a.duplicate_count(), 1);
        assert_eq!(a.occupied_count(), 1);
        assert_eq!(a.record_count(), 2);
        assert_eq!(a.density(), 0.5);
    }

    #[test]
    fn test_map_drops_shadowed_records() {
        let mut a = SparseArray::new(&[3]).unwrap();
        a.add(1, &[2]).unwrap();
        a.add(5, &[0]).unwrap();
        a.add(7, &[2]).unwrap();
        let m = a.map(|v| v * 10);
        assert_eq!(m.record_count(), 2);
        assert_eq!(m.fetch(&[0]).unwrap(), Some(&50));
        assert_eq!(m.fetch(&[2]).unwrap(), Some(&70));
        assert_eq!(m.duplicate_count(), 1);
    }

    #[test]
    fn test_iter_occupied_and_from_occupied() {
        let mut a = SparseArray::new(&[2, 2]).unwrap();
        a.add('b', &[1, 1]).unwrap();
        a.add('a', &[0, 1]).unwrap();
        let cells: Vec<_> = a.iter_occupied().map(|(f, idx, v)| (f, idx, *v)).collect();
        assert_eq!(cells, vec![(1, vec![0, 1], 'a'), (3, vec![1, 1], 'b')]);

        let b = SparseArray::from_occupied(&[2, 2], [(1, 'a'), (3, 'b')], 0).unwrap();
        assert_eq!(b.fetch(&[1, 1]).unwrap(), Some(&'b'));
        assert_eq!(b.occupied_count(), 2);
        assert!(SparseArray::from_occupied(&[2, 2], [(3, 'a'), (1, 'b')], 0).is_err());
        assert!(SparseArray::from_occupied(&[2, 2], [(4, 'a')], 0).is_err());
    }
}
