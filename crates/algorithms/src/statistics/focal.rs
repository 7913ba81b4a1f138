//! Focal (moving window) mean
//!
//! Averages, for each cell, the valid cells whose centers lie within a
//! circular window. Window cells outside the grid are ignored (no padding),
//! and a cell whose whole window is NoData stays NoData.

use ndarray::Array2;
use crate::maybe_rayon::*;
use lii_core::raster::{circle_offsets, Grid};
use lii_core::{Algorithm, Error, Result};
use tracing::debug;

/// Parameters for the focal mean
#[derive(Debug, Clone, Copy)]
pub struct FocalParams {
    /// Window radius in cells (Euclidean, center to center)
    pub radius: f64,
}

impl Default for FocalParams {
    fn default() -> Self {
        Self { radius: 1.0 }
    }
}

/// Convert a radius in map units to cells
pub fn radius_in_cells(map_radius: f64, cell_size: f64) -> Result<f64> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(Error::InvalidParameter {
            name: "cell_size",
            value: cell_size.to_string(),
            reason: "cell size must be positive".into(),
        });
    }
    Ok(map_radius / cell_size)
}

/// Circular window of precomputed offsets
#[derive(Debug, Clone)]
pub struct FocalKernel {
    radius: f64,
    offsets: Vec<(isize, isize)>,
}

impl FocalKernel {
    /// Circle of `radius` cells
    pub fn circle(radius: f64) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::InvalidParameter {
                name: "radius",
                value: radius.to_string(),
                reason: "focal radius must be > 0".into(),
            });
        }
        Ok(Self {
            radius,
            offsets: circle_offsets(radius),
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Window offsets (row, col), center included
    pub fn offsets(&self) -> &[(isize, isize)] {
        &self.offsets
    }

    /// Farthest row or column offset the window reads
    pub fn reach(&self) -> usize {
        self.radius.floor() as usize
    }

    /// Mean of the present window values. `value(dr, dc)` returns `None` for
    /// cells outside the grid or holding NoData. NaN if nothing is present.
    pub fn mean<F>(&self, value: F) -> f64
    where
        F: Fn(isize, isize) -> Option<f64>,
    {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &(dr, dc) in &self.offsets {
            if let Some(v) = value(dr, dc) {
                sum += v;
                count += 1;
            }
        }
        if count == 0 { f64::NAN } else { sum / count as f64 }
    }
}

/// Focal mean algorithm
#[derive(Debug, Clone, Default)]
pub struct FocalMean;

impl Algorithm for FocalMean {
    type Input = Grid<f64>;
    type Output = Grid<f64>;
    type Params = FocalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "FocalMean"
    }

    fn description(&self) -> &'static str {
        "Circular moving-window mean that ignores NoData"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        focal_mean(&input, params)
    }
}

/// Circular focal mean of a grid
///
/// # Arguments
/// * `grid` - Input grid
/// * `params` - Window radius in cells
pub fn focal_mean(grid: &Grid<f64>, params: FocalParams) -> Result<Grid<f64>> {
    let kernel = FocalKernel::circle(params.radius)?;
    let (rows, cols) = grid.shape();
    debug!(rows, cols, radius = params.radius, window = kernel.offsets().len(), "focal mean");

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                *out = kernel.mean(|dr, dc| {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        return None;
                    }
                    let v = unsafe { grid.get_unchecked(nr as usize, nc as usize) };
                    (!grid.is_nodata(v)).then_some(v)
                });
            }

            row_data
        })
        .collect();

    let mut output = grid.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
