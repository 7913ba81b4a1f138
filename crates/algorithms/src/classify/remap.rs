//! Remap-table reclassification
//!
//! Replaces each cell value with the score paired to it in a remap table.
//! The table must be total over the values present in the grid: a value with
//! no entry fails the whole call rather than being passed through.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use crate::maybe_rayon::*;
use lii_core::raster::{CellValue, Grid};
use lii_core::{Algorithm, Error, Result};
use tracing::debug;

/// Score assigned to cells that are NoData in the source grid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataScore {
    /// NoData stays NoData
    #[default]
    NoData,
    /// NoData cells receive this score
    Value(f64),
}

impl NoDataScore {
    fn as_f64(self) -> f64 {
        match self {
            NoDataScore::NoData => f64::NAN,
            NoDataScore::Value(v) => v,
        }
    }
}

/// Exact-match lookup from source value to score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemapTable {
    /// `(match_value, score)` pairs
    pub entries: Vec<(f64, f64)>,
    /// Score for NoData source cells
    #[serde(default)]
    pub nodata: NoDataScore,
}

impl RemapTable {
    /// Create a table from `(match_value, score)` pairs. NoData maps to NoData.
    pub fn new(entries: Vec<(f64, f64)>) -> Self {
        Self {
            entries,
            nodata: NoDataScore::NoData,
        }
    }

    /// Set the NoData policy
    pub fn with_nodata(mut self, nodata: NoDataScore) -> Self {
        self.nodata = nodata;
        self
    }

    /// Build a table keyed by category label, resolving labels to codes
    /// through the grid's category metadata.
    pub fn by_category<T: CellValue>(grid: &Grid<T>, pairs: &[(&str, f64)]) -> Result<Self> {
        let entries = pairs
            .iter()
            .map(|&(label, score)| {
                grid.category_code(label)
                    .map(|code| (code as f64, score))
                    .ok_or_else(|| Error::InvalidParameter {
                        name: "category",
                        value: label.to_string(),
                        reason: "no category with this label in the source grid".into(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(entries))
    }

    /// Check the table for NaN keys and conflicting duplicate entries
    pub fn validate(&self) -> Result<()> {
        let sorted = self.sorted_entries()?;
        for pair in sorted.windows(2) {
            if pair[0].0 == pair[1].0 && pair[0].1.to_bits() != pair[1].1.to_bits() {
                return Err(Error::InvalidParameter {
                    name: "remap_table",
                    value: pair[0].0.to_string(),
                    reason: format!("mapped to both {} and {}", pair[0].1, pair[1].1),
                });
            }
        }
        Ok(())
    }

    /// Score for a source value, `None` if the table has no entry for it
    pub fn lookup(&self, value: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| *key == value)
            .map(|(_, score)| *score)
    }

    fn sorted_entries(&self) -> Result<Vec<(f64, f64)>> {
        if let Some((key, _)) = self.entries.iter().find(|(key, _)| key.is_nan()) {
            return Err(Error::InvalidParameter {
                name: "remap_table",
                value: key.to_string(),
                reason: "match values must not be NaN".into(),
            });
        }
        // `+ 0.0` folds -0.0 into 0.0 so the total order matches `==`
        let mut sorted: Vec<(f64, f64)> = self.entries.iter().map(|&(k, v)| (k + 0.0, v)).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(sorted)
    }
}

/// Remap reclassification algorithm
#[derive(Debug, Clone, Default)]
pub struct Reclassify;

impl Algorithm for Reclassify {
    type Input = Grid<f64>;
    type Output = Grid<f64>;
    type Params = RemapTable;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Reclassify"
    }

    fn description(&self) -> &'static str {
        "Replace each cell value by its score in an exact-match remap table"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        reclassify(&input, &params)
    }
}

/// Reclassify a grid through a remap table.
///
/// Every non-NoData cell must have an exact entry in `table`; the first
/// unmapped cell in row-major order is reported as
/// [`Error::UnmappedValue`]. NoData cells follow `table.nodata`.
///
/// # Example
/// ```ignore
/// // Grassland condition classes, NoData scored as excluded
/// let table = RemapTable::new(vec![(1.0, 0.2), (2.0, 0.5), (3.0, 1.0)])
///     .with_nodata(NoDataScore::Value(-10.0));
/// let scored = reclassify(&condition, &table)?;
/// ```
pub fn reclassify(grid: &Grid<f64>, table: &RemapTable) -> Result<Grid<f64>> {
    table.validate()?;
    let sorted = table.sorted_entries()?;
    let (rows, cols) = grid.shape();
    debug!(rows, cols, entries = table.entries.len(), "reclassify");
    let nodata_score = table.nodata.as_f64();

    let lookup = |value: f64| -> Option<f64> {
        sorted
            .binary_search_by(|(key, _)| key.total_cmp(&(value + 0.0)))
            .ok()
            .map(|idx| sorted[idx].1)
    };

    let row_results: Vec<Result<Vec<f64>>> = (0..rows)
        .into_par_iter()
        .map(|row| -> Result<Vec<f64>> {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let value = unsafe { grid.get_unchecked(row, col) };
                if grid.is_nodata(value) {
                    *out = nodata_score;
                    continue;
                }
                *out = lookup(value).ok_or(Error::UnmappedValue { value, row, col })?;
            }
            Ok(row_data)
        })
        .collect();

    let mut data = Vec::with_capacity(rows * cols);
    for row in row_results {
        data.extend(row?);
    }

    let mut output = grid.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lii_core::GeoTransform;

    fn landcover() -> Grid<f64> {
        let mut g = Grid::from_vec(
            vec![
                71.0, 71.0, 52.0, //
                52.0, f64::NAN, 42.0, //
                42.0, 71.0, 52.0,
            ],
            3,
            3,
        )
        .unwrap();
        g.set_transform(GeoTransform::square(1000.0, 2000.0, 30.0));
        g.set_nodata(Some(f64::NAN));
        g.set_category(71, "Grassland/Herbaceous");
        g.set_category(52, "Shrub/Scrub");
        g.set_category(42, "Evergreen Forest");
        g
    }

    #[test]
    fn test_reclassify_total_table() {
        let table = RemapTable::new(vec![(71.0, 1.0), (52.0, 0.5), (42.0, 0.0)]);
        let out = reclassify(&landcover(), &table).unwrap();

        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(0, 2).unwrap(), 0.5);
        assert_eq!(out.get(2, 0).unwrap(), 0.0);
        assert!(out.get(1, 1).unwrap().is_nan());
        assert_eq!(out.geometry(), landcover().geometry());
    }

    #[test]
    fn test_nodata_score() {
        let table = RemapTable::new(vec![(71.0, 1.0), (52.0, 0.5), (42.0, 0.0)])
            .with_nodata(NoDataScore::Value(-10.0));
        let out = reclassify(&landcover(), &table).unwrap();
        assert_eq!(out.get(1, 1).unwrap(), -10.0);
    }

    #[test]
    fn test_unmapped_value_fails() {
        let table = RemapTable::new(vec![(71.0, 1.0), (52.0, 0.5)]);
        match reclassify(&landcover(), &table) {
            Err(Error::UnmappedValue { value, row, col }) => {
                assert_eq!(value, 42.0);
                assert_eq!((row, col), (1, 2));
            }
            other => panic!("expected UnmappedValue, got {:?}", other),
        }
    }

    #[test]
    fn test_by_category() {
        let grid = landcover();
        let table = RemapTable::by_category(
            &grid,
            &[
                ("Grassland/Herbaceous", 1.0),
                ("Shrub/Scrub", 0.75),
                ("Evergreen Forest", 0.1),
            ],
        )
        .unwrap();
        assert_eq!(table.lookup(52.0), Some(0.75));

        let out = reclassify(&grid, &table).unwrap();
        assert_eq!(out.get(1, 0).unwrap(), 0.75);

        assert!(RemapTable::by_category(&grid, &[("Open Water", 0.0)]).is_err());
    }

    #[test]
    fn test_validate_conflicting_entries() {
        let ok = RemapTable::new(vec![(1.0, 0.5), (1.0, 0.5), (2.0, 1.0)]);
        assert!(ok.validate().is_ok());
        let conflicting = RemapTable::new(vec![(1.0, 0.5), (2.0, 1.0), (1.0, 0.7)]);
        assert!(conflicting.validate().is_err());
        let nan_key = RemapTable::new(vec![(f64::NAN, 0.5)]);
        assert!(nan_key.validate().is_err());
    }

    #[test]
    fn test_signed_zero_matches() {
        let grid = Grid::from_vec(vec![-0.0, 0.0, 1.0, 1.0], 2, 2).unwrap();
        let table = RemapTable::new(vec![(0.0, 0.25), (1.0, 1.0)]);
        let out = reclassify(&grid, &table).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 0.25);
        assert_eq!(out.get(0, 1).unwrap(), 0.25);
    }
}
