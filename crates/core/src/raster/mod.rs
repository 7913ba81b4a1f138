//! Grid data structures and operations

mod element;
mod geotransform;
mod grid;
mod neighborhood;

pub use element::CellValue;
pub use geotransform::GeoTransform;
pub use grid::{ensure_coregistered, Grid, GridGeometry, GridStatistics};
pub use neighborhood::{circle_offsets, Connectivity};
