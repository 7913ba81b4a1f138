//! Cell value trait for generic grid contents

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a grid cell.
///
/// Scores and distances are `f64` grids with NaN as NoData; masks are `u8`
/// and patch labels `u32`, where NoData is an explicit sentinel.
pub trait CellValue:
    Copy + Debug + PartialOrd + NumCast + Zero + Send + Sync + 'static
{
    /// Sentinel used when a grid of this type needs a NoData marker
    fn default_nodata() -> Self;

    /// Check if this value represents NoData under the given sentinel
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert to f64 for statistics
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_cell_value_int {
    ($($t:ty),*) => {
        $(
            impl CellValue for $t {
                fn default_nodata() -> Self {
                    <$t>::MAX
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    nodata.is_some_and(|nd| *self == nd)
                }
            }
        )*
    };
}

macro_rules! impl_cell_value_float {
    ($($t:ty),*) => {
        $(
            impl CellValue for $t {
                fn default_nodata() -> Self {
                    <$t>::NAN
                }

                fn is_nodata(&self, nodata: Option<Self>) -> bool {
                    if self.is_nan() {
                        return true;
                    }
                    match nodata {
                        Some(nd) if !nd.is_nan() => (self - nd).abs() < <$t>::EPSILON * 100.0,
                        _ => false,
                    }
                }
            }
        )*
    };
}

impl_cell_value_int!(u8, u16, u32, i32, i64);
impl_cell_value_float!(f32, f64);
