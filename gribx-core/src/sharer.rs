use crate::coordinate::Coordinate;
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;

/// Shares structurally equal coordinates between the groups of one index.
#[derive(Debug, Default)]
pub struct CoordinateSharer {
    shared: Vec<Coordinate>,
    positions: FxHashMap<Coordinate, usize>,
}

impl CoordinateSharer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one group's coordinates and return their shared positions.
    pub fn add_coordinates(&mut self, coords: &[Coordinate]) -> Vec<usize> {
        coords.iter().map(|c| self.intern(c)).collect()
    }

    fn intern(&mut self, coord: &Coordinate) -> usize {
        if let Some(&idx) = self.positions.get(coord) {
            return idx;
        }
        let idx = self.shared.len();
        self.shared.push(coord.clone());
        self.positions.insert(coord.clone(), idx);
        idx
    }

    pub fn shared(&self) -> &[Coordinate] {
        &self.shared
    }

    pub fn reindex(&self, coords: &[Coordinate]) -> Result<Vec<usize>> {
        coords
            .iter()
            .map(|c| {
                self.positions.get(c).copied().ok_or_else(|| {
                    Error::not_found(format!("{} coordinate not shared", c.coord_type()))
                })
            })
            .collect()
    }

    pub fn into_shared(self) -> Vec<Coordinate> {
        self.shared
    }
}
