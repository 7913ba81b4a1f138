//! Main Grid type

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::raster::{CellValue, GeoTransform};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2-D grid of cells.
///
/// `Grid<T>` stores values of type `T` in row-major order together with the
/// affine transform that places it on the map, an optional NoData sentinel
/// and a table of named categories (code to label) for categorical grids.
///
/// # Example
///
/// ```ignore
/// use lii_core::{GeoTransform, Grid};
///
/// let mut landcover: Grid<f64> = Grid::filled(100, 100, 0.0);
/// landcover.set_transform(GeoTransform::square(0.0, 3000.0, 30.0));
/// landcover.set_category(71, "Grassland/Herbaceous");
/// landcover.set(10, 20, 71.0)?;
/// ```
#[derive(Debug, Clone)]
pub struct Grid<T: CellValue> {
    /// Cell values stored as (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
    /// Category code to label
    categories: BTreeMap<i64, String>,
}

impl<T: CellValue> Grid<T> {
    /// Create a new grid filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new grid filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a grid from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a grid from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
            categories: BTreeMap::new(),
        }
    }

    /// Create a grid on the same lattice with a different cell type.
    ///
    /// Category labels are not carried over: derived grids hold scores, not
    /// the source classification.
    pub fn with_same_meta<U: CellValue>(&self, rows: usize, cols: usize) -> Grid<U> {
        Grid {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            nodata: None,
            categories: BTreeMap::new(),
        }
    }

    /// Same-typed grid on this lattice, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata: self.nodata,
            categories: self.categories.clone(),
        }
    }

    /// Replace the cell array, keeping metadata. The shape must not change.
    pub fn replace_data(&mut self, data: Vec<T>) -> Result<()> {
        let (rows, cols) = self.shape();
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        self.data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(())
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Value at (row, col), or `None` if it is out of bounds or NoData
    pub fn value_at(&self, row: usize, col: usize) -> Option<T> {
        self.data
            .get((row, col))
            .copied()
            .filter(|v| !v.is_nodata(self.nodata))
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size in map units (square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Shape, origin and cell size of this grid
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry {
            rows: self.rows(),
            cols: self.cols(),
            cell_size: self.cell_size(),
            origin_x: self.transform.origin_x,
            origin_y: self.transform.origin_y,
        }
    }

    // Categories

    /// Named categories (code to label)
    pub fn categories(&self) -> &BTreeMap<i64, String> {
        &self.categories
    }

    /// Attach a label to a category code
    pub fn set_category(&mut self, code: i64, label: impl Into<String>) {
        self.categories.insert(code, label.into());
    }

    /// Code of the category carrying `label`, if any
    pub fn category_code(&self, label: &str) -> Option<i64> {
        self.categories
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(code, _)| *code)
    }

    // Value checks

    /// Check if a value is NoData
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding a valid value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    // Statistics

    /// Basic statistics over valid cells (min, max, mean, counts)
    pub fn statistics(&self) -> GridStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            min = match min {
                Some(m) if m <= value => Some(m),
                _ => Some(value),
            };
            max = match max {
                Some(m) if m >= value => Some(m),
                _ => Some(value),
            };

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        GridStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a grid
#[derive(Debug, Clone)]
pub struct GridStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

/// The lattice a grid occupies: dimensions, upper-left origin and cell size.
///
/// Grids combined in one reduction, multiply or window operation must share
/// a geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub rows: usize,
    pub cols: usize,
    pub cell_size: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl GridGeometry {
    /// Whether `other` describes the same lattice.
    ///
    /// Origins and cell sizes are compared with a tolerance of a millionth of
    /// a cell.
    pub fn matches(&self, other: &GridGeometry) -> bool {
        let tol = self.cell_size.abs().max(1.0) * 1e-6;
        self.rows == other.rows
            && self.cols == other.cols
            && (self.cell_size - other.cell_size).abs() <= tol
            && (self.origin_x - other.origin_x).abs() <= tol
            && (self.origin_y - other.origin_y).abs() <= tol
    }

    /// Fail with [`Error::GeometryMismatch`] unless `other` matches
    pub fn ensure_matches(&self, other: &GridGeometry) -> Result<()> {
        if self.matches(other) {
            Ok(())
        } else {
            Err(Error::GeometryMismatch {
                expected: *self,
                found: *other,
            })
        }
    }
}

impl fmt::Display for GridGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} cells of {} at ({}, {})",
            self.rows, self.cols, self.cell_size, self.origin_x, self.origin_y
        )
    }
}

/// Check that every grid shares the geometry of the first one
pub fn ensure_coregistered<T: CellValue>(grids: &[&Grid<T>]) -> Result<()> {
    let Some(first) = grids.first() else {
        return Ok(());
    };
    let expected = first.geometry();
    for grid in &grids[1..] {
        expected.ensure_matches(&grid.geometry())?;
    }
    Ok(())
}
