//! Landscape structure algorithms
//!
//! - **patches**: Connected-component labeling with patch area broadcast
//! - **distance**: Exact Euclidean distance to the nearest category cell

mod distance;
mod patches;

pub use distance::{distance_transform, DistanceParams, DistanceTransform};
pub use patches::{label_patches, patch_area, AreaUnits, PatchArea, PatchLabeling, PatchParams};
