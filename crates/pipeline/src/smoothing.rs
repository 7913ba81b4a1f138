//! Final focal smoothing of a composite

use lii_algorithms::statistics::{focal_mean, radius_in_cells, FocalKernel, FocalParams};
use lii_core::{Grid, Result};
use lii_parallel::TiledProcessor;
use tracing::debug;

use crate::config::{RadiusUnits, SmoothingConfig};

/// Smoothing radius in cells for a grid of the given cell size
pub fn radius_cells(config: &SmoothingConfig, cell_size: f64) -> Result<f64> {
    match config.units {
        RadiusUnits::Cells => Ok(config.radius),
        RadiusUnits::Map => radius_in_cells(config.radius, cell_size),
    }
}

/// Circular focal mean of `grid`, tiled with a halo when `tile_size` is set.
///
/// Both paths produce the same grid.
pub fn smooth(grid: &Grid<f64>, config: &SmoothingConfig) -> Result<Grid<f64>> {
    let radius = radius_cells(config, grid.cell_size())?;

    let Some(tile_size) = config.tile_size else {
        debug!(radius, "focal mean");
        return focal_mean(grid, FocalParams { radius });
    };

    let kernel = FocalKernel::circle(radius)?;
    let processor = TiledProcessor::new(tile_size, kernel.reach());
    debug!(radius, tile_size, halo = processor.halo(), "tiled focal mean");

    let mut output = processor.process(grid, |_, _, center, neighbor| {
        kernel.mean(|dr, dc| {
            let v = if dr == 0 && dc == 0 { Some(center) } else { neighbor(dr, dc) };
            v.filter(|x| !grid.is_nodata(*x))
        })
    })?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}
