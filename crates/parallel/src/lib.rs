//! # LII Parallel
//!
//! Parallel processing strategies for grid operations.
//!
//! This crate provides:
//! - `ProcessingMode` and `WorkerPool`: sequential, pooled or fixed-width fan-out of
//!   independent jobs on a pool built once
//! - `TiledProcessor`: tile-by-tile window evaluation with halo exchange
//!
//! Without the `parallel` feature every mode runs sequentially.

pub mod strategy;
pub mod tiled;

pub use strategy::{ProcessingMode, WorkerPool};
pub use tiled::{Tile, TileIterator, TiledProcessor};
