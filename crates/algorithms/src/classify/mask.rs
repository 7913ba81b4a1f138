//! Category masks and NoData management

use ndarray::Array2;
use crate::maybe_rayon::*;
use lii_core::raster::Grid;
use lii_core::{Error, Result};

/// Boolean membership grid: 1 where the cell holds one of `categories`,
/// 0 elsewhere. NoData source cells are outside the mask.
pub fn category_mask(grid: &Grid<f64>, categories: &[f64]) -> Result<Grid<u8>> {
    if categories.is_empty() {
        return Err(Error::InvalidParameter {
            name: "categories",
            value: "[]".into(),
            reason: "at least one category is required".into(),
        });
    }
    let (rows, cols) = grid.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let value = unsafe { grid.get_unchecked(row, col) };
                if !grid.is_nodata(value) && categories.contains(&value) {
                    *out = 1;
                }
            }
            row_data
        })
        .collect();

    let mut output = grid.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Turn every valid cell for which `predicate` holds into NoData
///
/// # Example
/// ```ignore
/// // Drop excluded (-10) scores and the open-water class (100)
/// let kept = set_null_where(&scores, |v| v < 0.0 || v == 100.0)?;
/// ```
pub fn set_null_where<F>(grid: &Grid<f64>, predicate: F) -> Result<Grid<f64>>
where
    F: Fn(f64) -> bool + Sync + Send,
{
    let (rows, cols) = grid.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let value = unsafe { grid.get_unchecked(row, col) };
                if grid.is_nodata(value) || predicate(value) {
                    continue;
                }
                *out = value;
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

/// NoData for negative scores (the excluded sentinel classes)
pub fn exclude_negative(grid: &Grid<f64>) -> Result<Grid<f64>> {
    set_null_where(grid, |v| v < 0.0)
}

/// Replace NoData cells with `value`
pub fn fill_nodata(grid: &Grid<f64>, value: f64) -> Result<Grid<f64>> {
    let (rows, cols) = grid.shape();
    let data: Vec<f64> = grid
        .data()
        .iter()
        .map(|&v| if grid.is_nodata(v) { value } else { v })
        .collect();

    let mut output = grid.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    output.replace_data(data)?;
    Ok(output)
}
