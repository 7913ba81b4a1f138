//! Ordered class-break reclassification
//!
//! Scores a continuous grid (patch area, distance) by the first class whose
//! upper break the value falls under. Values past the last break receive the
//! table's `above` score.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use crate::maybe_rayon::*;
use lii_core::raster::Grid;
use lii_core::{Error, Result};

/// One class of a threshold table: values below `upper` (or equal to it, when
/// `inclusive`) score `score`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdClass {
    pub upper: f64,
    #[serde(default)]
    pub inclusive: bool,
    pub score: f64,
}

impl ThresholdClass {
    /// Class for values strictly below `upper`
    pub fn below(upper: f64, score: f64) -> Self {
        Self {
            upper,
            inclusive: false,
            score,
        }
    }

    /// Class for values at or below `upper`
    pub fn at_most(upper: f64, score: f64) -> Self {
        Self {
            upper,
            inclusive: true,
            score,
        }
    }

    fn contains(&self, value: f64) -> bool {
        if self.inclusive {
            value <= self.upper
        } else {
            value < self.upper
        }
    }
}

/// Ordered class breaks with a score for values past the last break
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub classes: Vec<ThresholdClass>,
    pub above: f64,
}

impl ThresholdTable {
    /// Create a validated table
    pub fn new(classes: Vec<ThresholdClass>, above: f64) -> Result<Self> {
        let table = Self { classes, above };
        table.validate()?;
        Ok(table)
    }

    /// Breaks must be finite and strictly increasing
    pub fn validate(&self) -> Result<()> {
        let mut previous = f64::NEG_INFINITY;
        for class in &self.classes {
            if !class.upper.is_finite() || class.upper <= previous {
                return Err(Error::InvalidParameter {
                    name: "thresholds",
                    value: class.upper.to_string(),
                    reason: "class breaks must be finite and strictly increasing".into(),
                });
            }
            previous = class.upper;
        }
        Ok(())
    }

    /// Score for a single value; NaN stays NaN
    pub fn classify(&self, value: f64) -> f64 {
        if value.is_nan() {
            return f64::NAN;
        }
        self.classes
            .iter()
            .find(|class| class.contains(value))
            .map_or(self.above, |class| class.score)
    }
}

/// Reclassify a continuous grid by ordered class breaks. NoData stays NoData.
///
/// # Example
/// ```ignore
/// // Patch area (acres) to habitat score
/// let table = ThresholdTable::new(
///     vec![
///         ThresholdClass::below(320.0, -10.0),
///         ThresholdClass::below(12108.16, 0.75),
///         ThresholdClass::below(50004.245, 0.95),
///     ],
///     1.0,
/// )?;
/// let scored = reclassify_thresholds(&area_acres, &table)?;
/// ```
pub fn reclassify_thresholds(grid: &Grid<f64>, table: &ThresholdTable) -> Result<Grid<f64>> {
    table.validate()?;
    let (rows, cols) = grid.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let value = unsafe { grid.get_unchecked(row, col) };
                if grid.is_nodata(value) {
                    continue;
                }
                *out = table.classify(value);
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
