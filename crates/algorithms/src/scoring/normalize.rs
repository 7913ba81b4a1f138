//! Linear normalization to [0, 1]
//!
//! `n = (v - min) / (max - min)` per valid cell, with `min`/`max` either a
//! fixed theoretical range or the grid's own observed range. The inverse
//! variant returns `1 - n`, for indicators where a larger raw value means a
//! worse condition. Values outside a fixed range are not clamped.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use crate::maybe_rayon::*;
use lii_core::raster::Grid;
use lii_core::{Algorithm, Error, Result};
use tracing::debug;

/// Range a grid is normalized over
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizeRange {
    /// Theoretical range of the metric
    Fixed { min: f64, max: f64 },
    /// Observed min/max over valid cells
    #[default]
    Data,
}

/// Parameters for normalization
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeParams {
    pub range: NormalizeRange,
    /// Return `1 - normalized`
    pub inverse: bool,
}

/// Normalization algorithm
#[derive(Debug, Clone, Default)]
pub struct Normalize;

impl Algorithm for Normalize {
    type Input = Grid<f64>;
    type Output = Grid<f64>;
    type Params = NormalizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Normalize"
    }

    fn description(&self) -> &'static str {
        "Rescale a grid linearly to [0, 1] over a fixed or observed range"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        normalize(&input, params)
    }
}

/// Resolve the (min, max) pair to normalize over
fn resolve_range(grid: &Grid<f64>, range: NormalizeRange) -> Result<(f64, f64)> {
    let (min, max) = match range {
        NormalizeRange::Fixed { min, max } => {
            if !min.is_finite() || !max.is_finite() || max < min {
                return Err(Error::InvalidParameter {
                    name: "range",
                    value: format!("[{}, {}]", min, max),
                    reason: "fixed range must be finite with max >= min".into(),
                });
            }
            (min, max)
        }
        NormalizeRange::Data => {
            let stats = grid.statistics();
            match (stats.min, stats.max) {
                (Some(min), Some(max)) => (min, max),
                _ => return Err(Error::NoValidCells { operation: "normalize" }),
            }
        }
    };

    if max == min {
        return Err(Error::DegenerateRange { min, max });
    }
    Ok((min, max))
}

/// Normalize a grid to [0, 1]. NoData propagates.
///
/// # Errors
/// - [`Error::DegenerateRange`] when the range is empty (a constant grid
///   under [`NormalizeRange::Data`])
/// - [`Error::NoValidCells`] when a data-range grid has no valid cell
pub fn normalize(grid: &Grid<f64>, params: NormalizeParams) -> Result<Grid<f64>> {
    let (min, max) = resolve_range(grid, params.range)?;
    let span = max - min;
    let inverse = params.inverse;
    let (rows, cols) = grid.shape();
    debug!(rows, cols, min, max, inverse, "normalize");

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { grid.get_unchecked(row, col) };
                if grid.is_nodata(v) {
                    continue;
                }
                *out = if inverse { (max - v) / span } else { (v - min) / span };
            }
            row_data
        })
        .collect();

    let mut output = grid.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Normalize over a fixed `[min, max]`
pub fn normalize_fixed(grid: &Grid<f64>, min: f64, max: f64) -> Result<Grid<f64>> {
    normalize(
        grid,
        NormalizeParams {
            range: NormalizeRange::Fixed { min, max },
            inverse: false,
        },
    )
}

/// Normalize over the grid's observed range
pub fn normalize_data(grid: &Grid<f64>) -> Result<Grid<f64>> {
    normalize(grid, NormalizeParams::default())
}

/// `1 - normalized` over the given range
pub fn inverse_normalize(grid: &Grid<f64>, range: NormalizeRange) -> Result<Grid<f64>> {
    normalize(grid, NormalizeParams { range, inverse: true })
}
