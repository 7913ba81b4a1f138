//! Classification of source grids into scores
//!
//! - **remap**: Exact-match remap tables with an explicit NoData policy
//! - **threshold**: Ordered class breaks (conditional reclassification)
//! - **mask**: Category masks, conditional NoData and NoData fill

mod mask;
mod remap;
mod threshold;

pub use mask::{category_mask, exclude_negative, fill_nodata, set_null_where};
pub use remap::{reclassify, NoDataScore, Reclassify, RemapTable};
pub use threshold::{reclassify_thresholds, ThresholdClass, ThresholdTable};
