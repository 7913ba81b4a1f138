//! Error types for the scoring engine

use crate::raster::GridGeometry;
use thiserror::Error;

/// Main error type for grid operations.
///
/// Geometry, mapping and range errors are fatal for the operation that raises
/// them. Per-cell conditions (log of a non-positive distance, a reduction or
/// window with no valid operands) are never reported here: they become NoData.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid grid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in grid of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid geometry mismatch: expected {expected}, got {found}")]
    GeometryMismatch {
        expected: GridGeometry,
        found: GridGeometry,
    },

    #[error("Value {value} at ({row}, {col}) has no entry in the remap table")]
    UnmappedValue { value: f64, row: usize, col: usize },

    #[error("Degenerate normalization range: min = {min}, max = {max}")]
    DegenerateRange { min: f64, max: f64 },

    #[error("{operation}: grid has no valid cells")]
    NoValidCells { operation: &'static str },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for grid operations
pub type Result<T> = std::result::Result<T, Error>;
