//! # LII Algorithms
//!
//! Grid algorithms that turn classified and measured grids into comparable,
//! combinable and spatially smoothed scores.
//!
//! ## Algorithm Categories
//!
//! - **classify**: Remap tables, threshold classes, category masks, NoData exclusion
//! - **landscape**: Patch labeling with area broadcast, Euclidean distance transform
//! - **scoring**: Fixed/data-range normalization, log-decay combination
//! - **statistics**: Cell statistics across grids, circular focal mean

mod maybe_rayon;

pub mod classify;
pub mod landscape;
pub mod scoring;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classify::{
        category_mask, exclude_negative, fill_nodata, reclassify, reclassify_thresholds,
        set_null_where, NoDataScore, Reclassify, RemapTable, ThresholdClass, ThresholdTable,
    };
    pub use crate::landscape::{
        distance_transform, label_patches, patch_area, AreaUnits, DistanceParams,
        DistanceTransform, PatchArea, PatchLabeling, PatchParams,
    };
    pub use crate::scoring::{
        decay_combine, decay_combine_with, inverse_normalize, log10_distance, normalize,
        normalize_data, normalize_fixed, presence_multiply, CombineRule, DecayCombine, DecayParams,
        Normalize, NormalizeParams, NormalizeRange,
    };
    pub use crate::statistics::{
        cell_statistics, focal_mean, radius_in_cells, CellAccumulator, CellStatistic, CellStatistics,
        FocalKernel, FocalMean, FocalParams,
    };
    pub use lii_core::prelude::*;
}
