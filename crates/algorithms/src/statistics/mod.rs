//! Statistics across and around cells
//!
//! - **cell**: Per-cell reduction across a list of co-registered grids
//! - **focal**: Circular moving-window mean

mod cell;
mod focal;

pub use cell::{cell_statistics, CellAccumulator, CellStatistic, CellStatistics};
pub use focal::{focal_mean, radius_in_cells, FocalKernel, FocalMean, FocalParams};
