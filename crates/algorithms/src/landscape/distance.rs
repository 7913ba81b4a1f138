//! Euclidean distance transform ("structural connectivity")
//!
//! Exact multi-source Euclidean distance from every cell to the nearest mask
//! cell, using the separable lower-envelope algorithm of Felzenszwalb and
//! Huttenlocher (2012): a 1-D squared-distance transform down each column,
//! then along each row over the column result.
//!
//! Reference:
//! Felzenszwalb, P.F. & Huttenlocher, D.P. (2012). Distance Transforms of
//! Sampled Functions. Theory of Computing, 8, 415-428.

use ndarray::Array2;
use crate::maybe_rayon::*;
use lii_core::raster::Grid;
use lii_core::{Algorithm, Error, Result};
use tracing::debug;

/// Parameters for the distance transform
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceParams {
    /// Cells farther than this (map units) become NoData. `None` = unbounded.
    pub max_distance: Option<f64>,
    /// Cell size override in map units; defaults to the grid's cell size
    pub cell_size: Option<f64>,
}

/// Distance transform algorithm
#[derive(Debug, Clone, Default)]
pub struct DistanceTransform;

impl Algorithm for DistanceTransform {
    type Input = Grid<u8>;
    type Output = Grid<f64>;
    type Params = DistanceParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DistanceTransform"
    }

    fn description(&self) -> &'static str {
        "Exact Euclidean distance to the nearest mask cell, capped at a search radius"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        distance_transform(&input, params)
    }
}

/// 1-D squared distance transform of `f` into `out`.
///
/// Infinite samples contribute no parabola. If every sample is infinite the
/// output is all infinite.
fn edt_1d(f: &[f64], out: &mut [f64], v: &mut Vec<usize>, z: &mut Vec<f64>) {
    v.clear();
    z.clear();

    for (q, &fq) in f.iter().enumerate() {
        if !fq.is_finite() {
            continue;
        }
        let qf = q as f64;
        loop {
            let Some(&p) = v.last() else {
                v.push(q);
                z.push(f64::NEG_INFINITY);
                break;
            };
            let pf = p as f64;
            // intersection of the parabolas rooted at p and q
            let s = ((fq + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf));
            if z.last().is_some_and(|&zk| s <= zk) {
                v.pop();
                z.pop();
            } else {
                v.push(q);
                z.push(s);
                break;
            }
        }
    }

    if v.is_empty() {
        out.fill(f64::INFINITY);
        return;
    }

    let mut k = 0;
    for (q, o) in out.iter_mut().enumerate() {
        let qf = q as f64;
        while k + 1 < v.len() && z[k + 1] < qf {
            k += 1;
        }
        let d = qf - v[k] as f64;
        *o = d * d + f[v[k]];
    }
}

/// Distance in map units from every cell to the nearest mask cell.
///
/// Mask cells (nonzero, non-NoData) get 0. Cells farther than
/// `params.max_distance` are NoData rather than the cap value, and a mask
/// with no member cells yields an all-NoData grid.
///
/// # Arguments
/// * `mask` - Membership grid of the target category
/// * `params` - Search radius and cell size
pub fn distance_transform(mask: &Grid<u8>, params: DistanceParams) -> Result<Grid<f64>> {
    let cell_size = params.cell_size.unwrap_or_else(|| mask.cell_size());
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(Error::InvalidParameter {
            name: "cell_size",
            value: cell_size.to_string(),
            reason: "cell size must be positive".into(),
        });
    }
    if let Some(max) = params.max_distance
        && (max.is_nan() || max < 0.0)
    {
        return Err(Error::InvalidParameter {
            name: "max_distance",
            value: max.to_string(),
            reason: "search radius must be >= 0".into(),
        });
    }

    let (rows, cols) = mask.shape();
    debug!(rows, cols, cell_size, max_distance = ?params.max_distance, "distance transform");

    // column pass: squared row distance to the nearest member in the column
    let columns: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = (0..rows)
                .map(|row| {
                    let v = unsafe { mask.get_unchecked(row, col) };
                    if v != 0 && !mask.is_nodata(v) { 0.0 } else { f64::INFINITY }
                })
                .collect();
            let mut out = vec![f64::INFINITY; rows];
            edt_1d(&f, &mut out, &mut Vec::with_capacity(rows), &mut Vec::with_capacity(rows));
            out
        })
        .collect();

    let max_sq = params.max_distance.map(|m| m * m);

    // row pass over the column result
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let g: Vec<f64> = (0..cols).map(|col| columns[col][row]).collect();
            let mut sq = vec![f64::INFINITY; cols];
            edt_1d(&g, &mut sq, &mut Vec::with_capacity(cols), &mut Vec::with_capacity(cols));

            let mut row_data = vec![f64::NAN; cols];
            for (out, &d2_cells) in row_data.iter_mut().zip(&sq) {
                if !d2_cells.is_finite() {
                    continue;
                }
                let d2 = d2_cells * cell_size * cell_size;
                if max_sq.is_some_and(|m| d2 > m) {
                    continue;
                }
                *out = d2.sqrt();
            }
            row_data
        })
        .collect();

    let mut output = mask.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
