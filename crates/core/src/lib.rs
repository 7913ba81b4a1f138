//! # LII Core
//!
//! Core types and traits for the Landscape Integrity Index scoring engine.
//!
//! This crate provides:
//! - `Grid<T>`: co-registered 2-D cell grid with NoData and category metadata
//! - `GeoTransform`: affine transformation for georeferencing
//! - `GridGeometry`: the shape, origin and cell size a set of grids must share
//! - `Connectivity` and circular kernel offsets for neighborhood operations
//! - Algorithm traits for consistent API

pub mod error;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{CellValue, GeoTransform, Grid, GridGeometry};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        ensure_coregistered, CellValue, Connectivity, GeoTransform, Grid, GridGeometry,
    };
    pub use crate::Algorithm;
}

/// Core trait for grid algorithms.
///
/// Algorithms are pure functions that transform input grids according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
