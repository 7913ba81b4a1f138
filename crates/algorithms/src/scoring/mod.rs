//! Score standardization
//!
//! - **normalize**: Linear rescale to [0, 1] over a fixed or observed range
//! - **decay**: log10 distance decay combined with an impact weight

mod decay;
mod normalize;

pub use decay::{
    decay_combine, decay_combine_with, log10_distance, presence_multiply, CombineRule, DecayCombine,
    DecayParams,
};
pub use normalize::{
    inverse_normalize, normalize, normalize_data, normalize_fixed, Normalize, NormalizeParams,
    NormalizeRange,
};
