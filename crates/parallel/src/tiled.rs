//! Tiled processing for large grids
//!
//! The grid is cut into non-overlapping core tiles. Each tile copies its core
//! plus a halo of neighboring cells into a local buffer, and window kernels
//! read only from that buffer. A halo at least as wide as the kernel reach
//! makes the tiled result identical to an untiled pass.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use lii_core::raster::{CellValue, Grid};
use lii_core::{Error, Result};
use tracing::debug;

/// A core tile of a grid and the halo it reads around it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset of the core in the source grid
    pub row_offset: usize,
    /// Column offset of the core in the source grid
    pub col_offset: usize,
    /// Number of core rows
    pub rows: usize,
    /// Number of core columns
    pub cols: usize,
    /// Halo width in cells
    pub halo: usize,
}

impl Tile {
    /// Create a new tile
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize, halo: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
            halo,
        }
    }

    /// Core plus halo, clipped to the source grid, as
    /// (start_row, start_col, end_row, end_col) with exclusive ends
    pub fn extended_bounds(&self, src_rows: usize, src_cols: usize) -> (usize, usize, usize, usize) {
        (
            self.row_offset.saturating_sub(self.halo),
            self.col_offset.saturating_sub(self.halo),
            (self.row_offset + self.rows + self.halo).min(src_rows),
            (self.col_offset + self.cols + self.halo).min(src_cols),
        )
    }
}

/// Iterator over core tiles covering a grid, row-major
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    halo: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// Create a new tile iterator
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize, halo: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            halo,
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);
        let tile = Tile::new(self.current_row, self.current_col, rows, cols, self.halo);

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Local copy of a tile's core and halo
struct TileBuffer<T> {
    data: Vec<T>,
    start_row: usize,
    start_col: usize,
    rows: usize,
    cols: usize,
}

impl<T: CellValue> TileBuffer<T> {
    fn copy_from(input: &Grid<T>, tile: &Tile) -> Self {
        let (src_rows, src_cols) = input.shape();
        let (r0, c0, r1, c1) = tile.extended_bounds(src_rows, src_cols);
        let view = input.view();
        let mut data = Vec::with_capacity((r1 - r0) * (c1 - c0));
        for row in r0..r1 {
            for col in c0..c1 {
                data.push(view[(row, col)]);
            }
        }
        Self {
            data,
            start_row: r0,
            start_col: c0,
            rows: r1 - r0,
            cols: c1 - c0,
        }
    }

    /// Value at a source-grid position, `None` outside the buffer
    fn get(&self, src_row: isize, src_col: isize) -> Option<T> {
        let lr = src_row - self.start_row as isize;
        let lc = src_col - self.start_col as isize;
        if lr < 0 || lc < 0 || lr as usize >= self.rows || lc as usize >= self.cols {
            return None;
        }
        Some(self.data[lr as usize * self.cols + lc as usize])
    }
}

/// Processor for tiled window operations
#[derive(Debug, Clone, Copy)]
pub struct TiledProcessor {
    tile_size: usize,
    halo: usize,
}

impl TiledProcessor {
    /// Create a new tiled processor
    pub fn new(tile_size: usize, halo: usize) -> Self {
        Self { tile_size, halo }
    }

    /// Halo width in cells
    pub fn halo(&self) -> usize {
        self.halo
    }

    /// Evaluate `f` for every cell of `input`, tile by tile.
    ///
    /// `f` receives (row, col, value, neighbor) where `neighbor(dr, dc)`
    /// returns the value at the given offset, or `None` outside the grid.
    /// Offsets must not exceed the halo width.
    pub fn process<T, U, F>(&self, input: &Grid<T>, f: F) -> Result<Grid<U>>
    where
        T: CellValue,
        U: CellValue,
        F: Fn(usize, usize, T, &dyn Fn(isize, isize) -> Option<T>) -> U + Sync + Send,
    {
        if self.tile_size == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: "0".into(),
                reason: "tile size must be > 0".into(),
            });
        }

        let (rows, cols) = input.shape();
        let tiles: Vec<Tile> = TileIterator::new(rows, cols, self.tile_size, self.halo).collect();
        debug!(tiles = tiles.len(), tile_size = self.tile_size, halo = self.halo, "tiled pass");

        let run_tile = |tile: &Tile| -> Vec<U> {
            let buffer = TileBuffer::copy_from(input, tile);
            let mut out = Vec::with_capacity(tile.rows * tile.cols);
            for row in tile.row_offset..tile.row_offset + tile.rows {
                for col in tile.col_offset..tile.col_offset + tile.cols {
                    let neighbor = |dr: isize, dc: isize| buffer.get(row as isize + dr, col as isize + dc);
                    let value = input.data()[(row, col)];
                    out.push(f(row, col, value, &neighbor));
                }
            }
            out
        };

        #[cfg(feature = "parallel")]
        let results: Vec<Vec<U>> = tiles.par_iter().map(run_tile).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Vec<U>> = tiles.iter().map(run_tile).collect();

        let mut output = input.with_same_meta::<U>(rows, cols);
        output.set_nodata(Some(U::default_nodata()));
        let out = output.data_mut();
        for (tile, values) in tiles.iter().zip(results) {
            let mut it = values.into_iter();
            for row in tile.row_offset..tile.row_offset + tile.rows {
                for col in tile.col_offset..tile.col_offset + tile.cols {
                    if let Some(v) = it.next() {
                        out[(row, col)] = v;
                    }
                }
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_iterator() {
        let tiles: Vec<_> = TileIterator::new(100, 100, 32, 1).collect();
        assert_eq!(tiles.len(), 16);
        assert_eq!(tiles[0], Tile::new(0, 0, 32, 32, 1));
        assert_eq!(tiles[3], Tile::new(0, 96, 32, 4, 1));
        assert_eq!(tiles[15], Tile::new(96, 96, 4, 4, 1));
    }

    #[test]
    fn test_tile_coverage() {
        let rows = 70;
        let cols = 45;
        let mut covered = vec![vec![0u8; cols]; rows];

        for tile in TileIterator::new(rows, cols, 16, 3) {
            for r in tile.row_offset..tile.row_offset + tile.rows {
                for c in tile.col_offset..tile.col_offset + tile.cols {
                    covered[r][c] += 1;
                }
            }
        }

        for r in 0..rows {
            for c in 0..cols {
                assert_eq!(covered[r][c], 1, "Cell ({}, {}) covered {} times", r, c, covered[r][c]);
            }
        }
    }

    #[test]
    fn test_extended_bounds_clip() {
        let tile = Tile::new(0, 16, 16, 16, 2);
        assert_eq!(tile.extended_bounds(20, 40), (0, 14, 18, 34));
        let last = Tile::new(16, 32, 4, 8, 2);
        assert_eq!(last.extended_bounds(20, 40), (14, 30, 20, 40));
    }

    #[test]
    fn test_halo_exchange_matches_untiled() {
        let rows = 23;
        let cols = 17;
        let data: Vec<f64> = (0..rows * cols).map(|i| ((i * 7) % 13) as f64).collect();
        let grid = Grid::from_vec(data, rows, cols).unwrap();

        // 3x3 sum, clipped at the grid border
        let kernel = |_: usize, _: usize, v: f64, n: &dyn Fn(isize, isize) -> Option<f64>| {
            let mut s = 0.0;
            for dr in -1..=1 {
                for dc in -1..=1 {
                    if dr == 0 && dc == 0 {
                        s += v;
                    } else if let Some(x) = n(dr, dc) {
                        s += x;
                    }
                }
            }
            s
        };

        let tiled: Grid<f64> = TiledProcessor::new(5, 1).process(&grid, kernel).unwrap();
        let whole: Grid<f64> = TiledProcessor::new(64, 1).process(&grid, kernel).unwrap();

        for r in 0..rows {
            for c in 0..cols {
                assert_eq!(tiled.get(r, c).unwrap(), whole.get(r, c).unwrap(), "({}, {})", r, c);
            }
        }
        // corner: 0 + 7 + (119 % 13) + (126 % 13)
        assert_eq!(whole.get(0, 0).unwrap(), 18.0);
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let grid: Grid<f64> = Grid::new(4, 4);
        let result: Result<Grid<f64>> = TiledProcessor::new(0, 1).process(&grid, |_, _, v, _| v);
        assert!(result.is_err());
    }
}
