//! Neighborhood definitions for grid analysis

use serde::{Deserialize, Serialize};

/// Adjacency rule used when grouping cells into patches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Edge neighbors only (N, S, E, W)
    Four,
    /// Edge and corner neighbors
    #[default]
    Eight,
}

impl Connectivity {
    /// Offsets of the neighbors already visited in a raster scan
    /// (rows above, and the cell to the left).
    pub fn backward_offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &[(-1, 0), (0, -1)],
            Connectivity::Eight => &[(-1, -1), (-1, 0), (-1, 1), (0, -1)],
        }
    }

    /// All neighbor offsets, excluding the center
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &[(-1, 0), (0, -1), (0, 1), (1, 0)],
            Connectivity::Eight => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        }
    }
}

/// Offsets of every cell whose center lies within `radius` cells of the
/// window center (Euclidean), center included.
///
/// Offsets are produced row by row. A radius below 1 yields only the center.
pub fn circle_offsets(radius: f64) -> Vec<(isize, isize)> {
    if !radius.is_finite() || radius < 0.0 {
        return Vec::new();
    }
    let r = radius.floor() as isize;
    let r_sq = radius * radius;
    let mut offsets = Vec::new();
    for dr in -r..=r {
        for dc in -r..=r {
            if ((dr * dr + dc * dc) as f64) <= r_sq + 1e-9 {
                offsets.push((dr, dc));
            }
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_offsets() {
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
        assert_eq!(Connectivity::Eight.backward_offsets().len(), 4);
        assert_eq!(Connectivity::default(), Connectivity::Eight);
    }

    #[test]
    fn test_circle_offsets() {
        assert_eq!(circle_offsets(0.0), vec![(0, 0)]);
        assert_eq!(circle_offsets(1.0).len(), 5);
        assert_eq!(circle_offsets(1.5).len(), 9);
        assert_eq!(circle_offsets(2.0).len(), 13);
        assert!(circle_offsets(-1.0).is_empty());
    }
}
