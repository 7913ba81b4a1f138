//! Input grids supplied by the external GIS layer

use std::collections::HashMap;

use lii_core::Grid;

use crate::error::{PipelineError, Result};

/// Supplier of co-registered, already clipped and reprojected input grids.
///
/// Grids are loaded on demand, one per indicator, and dropped once scored.
pub trait GridSource: Sync {
    /// Grid stored under `key`
    fn load(&self, key: &str) -> Result<Grid<f64>>;
}

/// Grids held in memory by key
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    grids: HashMap<String, Grid<f64>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the grid under `key`
    pub fn insert(&mut self, key: impl Into<String>, grid: Grid<f64>) {
        self.grids.insert(key.into(), grid);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, grid: Grid<f64>) -> Self {
        self.insert(key, grid);
        self
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

impl GridSource for InMemorySource {
    fn load(&self, key: &str) -> Result<Grid<f64>> {
        self.grids
            .get(key)
            .cloned()
            .ok_or_else(|| PipelineError::MissingInput {
                key: key.to_string(),
            })
    }
}
