//! Distance decay combination
//!
//! Turns a distance-to-stressor grid into an impact score:
//! 1. `d = log10(distance)`, with non-positive distances (the stressor cells
//!    themselves) as NoData;
//! 2. `n = normalize(d)` over the observed range;
//! 3. `n` times the stressor's impact weight under a presence-aware multiply,
//!    so cells without a distance value still carry the weight.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::maybe_rayon::*;
use crate::scoring::normalize::normalize_data;
use lii_core::raster::{ensure_coregistered, Grid};
use lii_core::{Algorithm, Error, Result};

/// Which operands count as present in a presence-aware multiply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineRule {
    /// Any valid value is present; zero multiplies normally
    #[default]
    PresentOperands,
    /// Zero counts as absent: a zero operand passes the other one through,
    /// and a cell whose only operands are zero becomes NoData
    NonZeroOperands,
}

/// Parameters for decay combination
#[derive(Debug, Clone, Copy)]
pub struct DecayParams {
    /// Impact weight of the stressor type, in [0, 1]
    pub impact_weight: f64,
    pub rule: CombineRule,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            impact_weight: 1.0,
            rule: CombineRule::PresentOperands,
        }
    }
}

#[inline]
fn combine_cell(a: Option<f64>, b: Option<f64>, rule: CombineRule) -> f64 {
    let present = |v: Option<f64>| match rule {
        CombineRule::PresentOperands => v,
        CombineRule::NonZeroOperands => v.filter(|x| *x != 0.0),
    };
    match (present(a), present(b)) {
        (Some(x), Some(y)) => x * y,
        (Some(x), None) => x,
        (None, Some(y)) => y,
        (None, None) => f64::NAN,
    }
}

/// Cell-wise log10 of a distance grid; distances <= 0 become NoData
pub fn log10_distance(distance: &Grid<f64>) -> Result<Grid<f64>> {
    let (rows, cols) = distance.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let d = unsafe { distance.get_unchecked(row, col) };
                if distance.is_nodata(d) || d <= 0.0 {
                    continue;
                }
                *out = d.log10();
            }
            row_data
        })
        .collect();

    let mut output = distance.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Presence-aware multiply of two co-registered grids.
///
/// Where both operands are present the result is their product; where only
/// one is present it passes through unchanged; where neither is, NoData.
pub fn presence_multiply(a: &Grid<f64>, b: &Grid<f64>, rule: CombineRule) -> Result<Grid<f64>> {
    ensure_coregistered(&[a, b])?;
    let (rows, cols) = a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| combine_cell(a.value_at(row, col), b.value_at(row, col), rule))
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut output = a.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Decay combination algorithm
#[derive(Debug, Clone, Default)]
pub struct DecayCombine;

impl Algorithm for DecayCombine {
    type Input = Grid<f64>;
    type Output = Grid<f64>;
    type Params = DecayParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DecayCombine"
    }

    fn description(&self) -> &'static str {
        "log10 distance decay, normalized and weighted by stressor impact"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        decay_combine_with(&input, params)
    }
}

/// log10 decay, data-range normalization and weighting of a distance grid
pub fn decay_combine(distance: &Grid<f64>, impact_weight: f64) -> Result<Grid<f64>> {
    decay_combine_with(
        distance,
        DecayParams {
            impact_weight,
            ..Default::default()
        },
    )
}

/// [`decay_combine`] with an explicit combine rule.
///
/// A distance grid with no positive distance normalizes to all NoData, and
/// every cell then carries the impact weight. A log grid of one repeated
/// value is a [`Error::DegenerateRange`].
pub fn decay_combine_with(distance: &Grid<f64>, params: DecayParams) -> Result<Grid<f64>> {
    let weight = params.impact_weight;
    if !(0.0..=1.0).contains(&weight) {
        return Err(Error::InvalidParameter {
            name: "impact_weight",
            value: weight.to_string(),
            reason: "impact weight must be in [0, 1]".into(),
        });
    }

    let decayed = log10_distance(distance)?;
    let normalized = match normalize_data(&decayed) {
        Ok(n) => n,
        Err(Error::NoValidCells { .. }) => {
            debug!("decay: no positive distances, weight passes through");
            decayed
        }
        Err(e) => return Err(e),
    };

    let (rows, cols) = normalized.shape();
    let rule = params.rule;
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| combine_cell(normalized.value_at(row, col), Some(weight), rule))
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut output = distance.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
