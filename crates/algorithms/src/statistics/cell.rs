//! Cell statistics across grids
//!
//! Reduces an ordered list of co-registered grids cell by cell using only the
//! inputs that have data at that cell. A cell is NoData only where every
//! input is NoData. MIN and MEAN are independent of input order.

use serde::{Deserialize, Serialize};
use lii_core::raster::{GeoTransform, Grid, GridGeometry};
use lii_core::{Algorithm, Error, Result};

/// Reduction applied per cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatistic {
    /// Smallest present value (worst sub-condition)
    #[default]
    Minimum,
    /// Arithmetic mean of present values
    Mean,
}

/// Incremental per-cell reduction.
///
/// Grids are folded in one at a time, so a caller never needs to hold more
/// than the accumulator and the grid being added.
#[derive(Debug, Clone)]
pub struct CellAccumulator {
    statistic: CellStatistic,
    geometry: Option<GridGeometry>,
    transform: GeoTransform,
    /// running minimum or running sum
    values: Vec<f64>,
    counts: Vec<u32>,
    grids: usize,
}

impl CellAccumulator {
    /// Empty accumulator; the first grid added fixes the geometry
    pub fn new(statistic: CellStatistic) -> Self {
        Self {
            statistic,
            geometry: None,
            transform: GeoTransform::default(),
            values: Vec::new(),
            counts: Vec::new(),
            grids: 0,
        }
    }

    /// Number of grids folded in so far
    pub fn len(&self) -> usize {
        self.grids
    }

    /// Whether no grid has been added
    pub fn is_empty(&self) -> bool {
        self.grids == 0
    }

    /// Fold a grid in.
    ///
    /// # Errors
    /// [`Error::GeometryMismatch`] if `grid` is not co-registered with the
    /// grids already added.
    pub fn add(&mut self, grid: &Grid<f64>) -> Result<()> {
        let geometry = grid.geometry();
        match self.geometry {
            Some(expected) => expected.ensure_matches(&geometry)?,
            None => {
                self.geometry = Some(geometry);
                self.transform = *grid.transform();
                let n = grid.len();
                let init = match self.statistic {
                    CellStatistic::Minimum => f64::INFINITY,
                    CellStatistic::Mean => 0.0,
                };
                self.values = vec![init; n];
                self.counts = vec![0; n];
            }
        }

        let cells = self.values.iter_mut().zip(self.counts.iter_mut());
        for ((acc, count), &v) in cells.zip(grid.data().iter()) {
            if grid.is_nodata(v) {
                continue;
            }
            match self.statistic {
                CellStatistic::Minimum => *acc = acc.min(v),
                CellStatistic::Mean => *acc += v,
            }
            *count += 1;
        }
        self.grids += 1;
        Ok(())
    }

    /// Finish the reduction
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] if no grid was added.
    pub fn finish(self) -> Result<Grid<f64>> {
        let Some(geometry) = self.geometry else {
            return Err(Error::InvalidParameter {
                name: "grids",
                value: "0".into(),
                reason: "cell statistics need at least one grid".into(),
            });
        };

        let statistic = self.statistic;
        let data: Vec<f64> = self
            .values
            .into_iter()
            .zip(self.counts)
            .map(|(acc, count)| match (count, statistic) {
                (0, _) => f64::NAN,
                (_, CellStatistic::Minimum) => acc,
                (n, CellStatistic::Mean) => acc / n as f64,
            })
            .collect();

        let mut output = Grid::from_vec(data, geometry.rows, geometry.cols)?;
        output.set_transform(self.transform);
        output.set_nodata(Some(f64::NAN));
        Ok(output)
    }
}

/// Cell statistics algorithm over an ordered list of grids
#[derive(Debug, Clone, Default)]
pub struct CellStatistics;

impl Algorithm for CellStatistics {
    type Input = Vec<Grid<f64>>;
    type Output = Grid<f64>;
    type Params = CellStatistic;
    type Error = Error;

    fn name(&self) -> &'static str {
        "CellStatistics"
    }

    fn description(&self) -> &'static str {
        "Per-cell minimum or mean across grids, ignoring NoData operands"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let mut acc = CellAccumulator::new(params);
        for grid in &input {
            acc.add(grid)?;
        }
        acc.finish()
    }
}

/// Reduce co-registered grids cell by cell, ignoring NoData operands.
///
/// # Errors
/// - [`Error::InvalidParameter`] for an empty list
/// - [`Error::GeometryMismatch`] if the grids are not co-registered
pub fn cell_statistics(grids: &[&Grid<f64>], statistic: CellStatistic) -> Result<Grid<f64>> {
    let mut acc = CellAccumulator::new(statistic);
    for grid in grids {
        acc.add(grid)?;
    }
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lii_core::GeoTransform;

    fn grid(values: Vec<f64>) -> Grid<f64> {
        let mut g = Grid::from_vec(values, 2, 2).unwrap();
        g.set_transform(GeoTransform::square(100.0, 160.0, 30.0));
        g
    }

    #[test]
    fn test_mean_ignores_missing() {
        let a = grid(vec![3.0, 1.0, f64::NAN, 0.5]);
        let b = grid(vec![f64::NAN, 2.0, f64::NAN, 0.25]);
        let out = cell_statistics(&[&a, &b], CellStatistic::Mean).unwrap();

        assert_eq!(out.get(0, 0).unwrap(), 3.0);
        assert_eq!(out.get(0, 1).unwrap(), 1.5);
        assert!(out.get(1, 0).unwrap().is_nan());
        assert_eq!(out.get(1, 1).unwrap(), 0.375);
        assert_eq!(out.geometry(), a.geometry());
    }

    #[test]
    fn test_minimum() {
        let a = grid(vec![0.9, f64::NAN, 0.2, 0.5]);
        let b = grid(vec![0.4, 0.7, f64::NAN, 0.5]);
        let c = grid(vec![0.6, f64::NAN, 0.1, f64::NAN]);
        let out = cell_statistics(&[&a, &b, &c], CellStatistic::Minimum).unwrap();

        assert_eq!(out.get(0, 0).unwrap(), 0.4);
        assert_eq!(out.get(0, 1).unwrap(), 0.7);
        assert_eq!(out.get(1, 0).unwrap(), 0.1);
        assert_eq!(out.get(1, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_all_nodata_inputs() {
        let a = grid(vec![f64::NAN; 4]);
        let b = grid(vec![f64::NAN; 4]);
        let out = cell_statistics(&[&a, &b], CellStatistic::Mean).unwrap();
        assert_eq!(out.valid_count(), 0);
    }

    #[test]
    fn test_sentinel_nodata_is_ignored() {
        let mut a = grid(vec![-9999.0, 1.0, 1.0, 1.0]);
        a.set_nodata(Some(-9999.0));
        let b = grid(vec![0.5, 0.5, 0.5, 0.5]);
        let out = cell_statistics(&[&a, &b], CellStatistic::Minimum).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0.5);
    }

    #[test]
    fn test_empty_list_and_mismatch() {
        assert!(matches!(
            cell_statistics(&[], CellStatistic::Mean),
            Err(Error::InvalidParameter { .. })
        ));

        let a = grid(vec![1.0; 4]);
        let mut shifted = grid(vec![1.0; 4]);
        shifted.set_transform(GeoTransform::square(130.0, 160.0, 30.0));
        assert!(matches!(
            cell_statistics(&[&a, &shifted], CellStatistic::Minimum),
            Err(Error::GeometryMismatch { .. })
        ));
    }

    #[test]
    fn test_accumulator_matches_batch() {
        let a = grid(vec![0.1, 0.2, f64::NAN, 0.4]);
        let b = grid(vec![0.3, f64::NAN, f64::NAN, 0.8]);

        let mut acc = CellAccumulator::new(CellStatistic::Mean);
        assert!(acc.is_empty());
        acc.add(&a).unwrap();
        acc.add(&b).unwrap();
        assert_eq!(acc.len(), 2);
        let incremental = acc.finish().unwrap();
        let batch = cell_statistics(&[&a, &b], CellStatistic::Mean).unwrap();

        for (x, y) in incremental.data().iter().zip(batch.data().iter()) {
            assert!((x.is_nan() && y.is_nan()) || x == y);
        }
    }
}
