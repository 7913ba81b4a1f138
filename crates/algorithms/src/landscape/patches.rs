//! Patch labeling ("region grouping")
//!
//! Groups mask cells into patches of 8- (or 4-) connected cells with a
//! union-find labeling pass run over horizontal bands. Each band is labeled
//! independently, labels are merged across band seams, and final labels are
//! assigned in raster scan order, so the result does not depend on how the
//! grid was banded.
//!
//! The area grid stamps every member cell with the total area of its patch,
//! which is what downstream scoring thresholds against.

use serde::{Deserialize, Serialize};
use crate::maybe_rayon::*;
use lii_core::raster::{Connectivity, Grid};
use lii_core::{Algorithm, Error, Result};
use tracing::debug;

/// Rows per labeling band
const BAND_ROWS: usize = 256;

/// Square metres per acre
const ACRE_M2: f64 = 4046.856_422_4;

/// Units for patch area, assuming map units are metres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnits {
    /// Square map units (cell count times cell size squared)
    #[default]
    SquareMapUnits,
    /// Hectares
    Hectares,
    /// Acres
    Acres,
}

impl AreaUnits {
    /// Multiplier from square map units
    pub fn factor(&self) -> f64 {
        match self {
            AreaUnits::SquareMapUnits => 1.0,
            AreaUnits::Hectares => 1e-4,
            AreaUnits::Acres => 1.0 / ACRE_M2,
        }
    }
}

/// Parameters for patch labeling
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchParams {
    /// Adjacency rule (default: eight neighbors)
    pub connectivity: Connectivity,
    /// Units of the area grid
    pub units: AreaUnits,
}

/// Result of a labeling run
#[derive(Debug, Clone)]
pub struct PatchLabeling {
    /// Patch label per cell, 1-based in scan order; 0 (NoData) outside patches
    pub labels: Grid<u32>,
    /// Cell count per patch, indexed by `label - 1`
    pub counts: Vec<usize>,
}

impl PatchLabeling {
    /// Number of patches
    pub fn patch_count(&self) -> usize {
        self.counts.len()
    }

    /// Cell count of a patch, `None` for label 0 or unknown labels
    pub fn cell_count(&self, label: u32) -> Option<usize> {
        (label as usize).checked_sub(1).and_then(|i| self.counts.get(i).copied())
    }

    /// Area of a patch in the given units
    pub fn area(&self, label: u32, units: AreaUnits) -> Option<f64> {
        let cell_area = self.labels.cell_size().powi(2) * units.factor();
        self.cell_count(label).map(|n| n as f64 * cell_area)
    }

    /// Grid holding, at every member cell, the total area of its patch.
    /// Cells outside any patch are NoData.
    pub fn area_grid(&self, units: AreaUnits) -> Result<Grid<f64>> {
        let (rows, cols) = self.labels.shape();
        let cell_area = self.labels.cell_size().powi(2) * units.factor();
        let areas: Vec<f64> = self.counts.iter().map(|&n| n as f64 * cell_area).collect();

        let data: Vec<f64> = self
            .labels
            .data()
            .iter()
            .map(|&label| match label {
                0 => f64::NAN,
                l => areas[l as usize - 1],
            })
            .collect();

        let mut output = self.labels.with_same_meta::<f64>(rows, cols);
        output.set_nodata(Some(f64::NAN));
        output.replace_data(data)?;
        Ok(output)
    }
}

/// Label the patches of a mask grid (nonzero, non-NoData cells are members).
pub fn label_patches(mask: &Grid<u8>, params: PatchParams) -> Result<PatchLabeling> {
    label_banded(mask, params.connectivity, BAND_ROWS)
}

/// Label patches and return the area grid in `params.units`
pub fn patch_area(mask: &Grid<u8>, params: PatchParams) -> Result<Grid<f64>> {
    label_patches(mask, params)?.area_grid(params.units)
}

/// Patch area algorithm
#[derive(Debug, Clone, Default)]
pub struct PatchArea;

impl Algorithm for PatchArea {
    type Input = Grid<u8>;
    type Output = Grid<f64>;
    type Params = PatchParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PatchArea"
    }

    fn description(&self) -> &'static str {
        "Label connected patches of a mask and stamp each member cell with its patch area"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        patch_area(&input, params)
    }
}

/// Disjoint-set forest over provisional labels
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        // keep the smaller root so roots follow scan order
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

/// Band-local labels, compacted to 1..=count (0 outside patches)
struct BandLabels {
    start_row: usize,
    labels: Vec<u32>,
    count: usize,
}

fn is_member(mask: &Grid<u8>, row: usize, col: usize) -> bool {
    let v = unsafe { mask.get_unchecked(row, col) };
    v != 0 && !mask.is_nodata(v)
}

fn label_band(mask: &Grid<u8>, conn: Connectivity, start_row: usize, end_row: usize) -> BandLabels {
    let cols = mask.cols();
    let band_rows = end_row - start_row;
    let mut provisional = vec![0usize; band_rows * cols];
    // index 0 is the "no label" slot
    let mut sets = DisjointSet::new(1);

    for lr in 0..band_rows {
        for col in 0..cols {
            if !is_member(mask, start_row + lr, col) {
                continue;
            }
            let mut current = 0usize;
            for &(dr, dc) in conn.backward_offsets() {
                let nr = lr as isize + dr;
                let nc = col as isize + dc;
                if nr < 0 || nc < 0 || nc as usize >= cols {
                    continue;
                }
                let neighbor = provisional[nr as usize * cols + nc as usize];
                if neighbor == 0 {
                    continue;
                }
                if current == 0 {
                    current = neighbor;
                } else {
                    sets.union(current, neighbor);
                }
            }
            if current == 0 {
                current = sets.push();
            }
            provisional[lr * cols + col] = current;
        }
    }

    // compact roots to 1..=count in scan order
    let mut compact = vec![0u32; sets.parent.len()];
    let mut count = 0usize;
    let mut labels = vec![0u32; band_rows * cols];
    for (i, &p) in provisional.iter().enumerate() {
        if p == 0 {
            continue;
        }
        let root = sets.find(p);
        if compact[root] == 0 {
            count += 1;
            compact[root] = count as u32;
        }
        labels[i] = compact[root];
    }

    BandLabels {
        start_row,
        labels,
        count,
    }
}

fn label_banded(mask: &Grid<u8>, conn: Connectivity, band_rows: usize) -> Result<PatchLabeling> {
    if band_rows == 0 {
        return Err(Error::InvalidParameter {
            name: "band_rows",
            value: "0".into(),
            reason: "band height must be > 0".into(),
        });
    }
    let (rows, cols) = mask.shape();
    let n_bands = rows.div_ceil(band_rows);
    debug!(rows, cols, bands = n_bands, connectivity = ?conn, "labeling patches");

    let bands: Vec<BandLabels> = (0..n_bands)
        .into_par_iter()
        .map(|b| {
            let start = b * band_rows;
            label_band(mask, conn, start, (start + band_rows).min(rows))
        })
        .collect();

    // global ids: offsets[b] + local label
    let mut offsets = Vec::with_capacity(bands.len());
    let mut total = 0usize;
    for band in &bands {
        offsets.push(total);
        total += band.count;
    }
    if total > u32::MAX as usize - 1 {
        return Err(Error::Algorithm(format!("too many patches: {}", total)));
    }
    let mut sets = DisjointSet::new(total + 1);

    // merge across seams: top row of each band against the bottom row of the band above
    let seam_offsets: &[isize] = match conn {
        Connectivity::Four => &[0],
        Connectivity::Eight => &[-1, 0, 1],
    };
    for b in 1..bands.len() {
        let upper = &bands[b - 1];
        let lower = &bands[b];
        let upper_last = (lower.start_row - upper.start_row - 1) * cols;
        for col in 0..cols {
            let below = lower.labels[col];
            if below == 0 {
                continue;
            }
            for &dc in seam_offsets {
                let nc = col as isize + dc;
                if nc < 0 || nc as usize >= cols {
                    continue;
                }
                let above = upper.labels[upper_last + nc as usize];
                if above != 0 {
                    sets.union(
                        offsets[b - 1] + above as usize,
                        offsets[b] + below as usize,
                    );
                }
            }
        }
    }

    // final labels in scan order
    let mut relabel = vec![0u32; total + 1];
    let mut counts: Vec<usize> = Vec::new();
    let mut data = Vec::with_capacity(rows * cols);
    for (b, band) in bands.iter().enumerate() {
        for &local in &band.labels {
            if local == 0 {
                data.push(0u32);
                continue;
            }
            let root = sets.find(offsets[b] + local as usize);
            if relabel[root] == 0 {
                counts.push(0);
                relabel[root] = counts.len() as u32;
            }
            let label = relabel[root];
            counts[label as usize - 1] += 1;
            data.push(label);
        }
    }

    let mut labels = mask.with_same_meta::<u32>(rows, cols);
    labels.set_nodata(Some(0));
    labels.replace_data(data)?;

    Ok(PatchLabeling { labels, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lii_core::GeoTransform;

    fn mask_from(rows: usize, cols: usize, cells: &[(usize, usize)], cell_size: f64) -> Grid<u8> {
        let mut m: Grid<u8> = Grid::new(rows, cols);
        m.set_transform(GeoTransform::square(0.0, rows as f64 * cell_size, cell_size));
        for &(r, c) in cells {
            m.set(r, c, 1).unwrap();
        }
        m
    }

    #[test]
    fn test_diagonal_cells_join_with_eight() {
        let mask = mask_from(3, 3, &[(0, 0), (1, 1)], 1.0);
        let eight = label_patches(&mask, PatchParams::default()).unwrap();
        assert_eq!(eight.patch_count(), 1);
        assert_eq!(eight.labels.get(0, 0).unwrap(), eight.labels.get(1, 1).unwrap());

        let four = label_patches(
            &mask,
            PatchParams {
                connectivity: Connectivity::Four,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(four.patch_count(), 2);
    }

    #[test]
    fn test_separated_cells_differ() {
        let mask = mask_from(3, 5, &[(1, 0), (1, 2), (1, 4)], 1.0);
        let result = label_patches(&mask, PatchParams::default()).unwrap();
        assert_eq!(result.patch_count(), 3);
        assert_eq!(result.labels.get(1, 0).unwrap(), 1);
        assert_eq!(result.labels.get(1, 2).unwrap(), 2);
        assert_eq!(result.labels.get(1, 4).unwrap(), 3);
        assert_eq!(result.labels.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_area_grid() {
        // L-shaped patch of 4 cells and an isolated cell, 30 m cells
        let mask = mask_from(4, 4, &[(0, 0), (1, 0), (2, 0), (2, 1), (0, 3)], 30.0);
        let result = label_patches(&mask, PatchParams::default()).unwrap();
        assert_eq!(result.counts, vec![4, 1]);

        let area = result.area_grid(AreaUnits::SquareMapUnits).unwrap();
        assert_eq!(area.get(2, 1).unwrap(), 3600.0);
        assert_eq!(area.get(0, 3).unwrap(), 900.0);
        assert!(area.get(3, 3).unwrap().is_nan());
        assert_eq!(area.geometry(), mask.geometry());

        let acres = result.area(2, AreaUnits::Acres).unwrap();
        assert!((acres - 0.222395).abs() < 1e-6, "acres {}", acres);
        let ha = result.area(1, AreaUnits::Hectares).unwrap();
        assert!((ha - 0.36).abs() < 1e-12);
    }

    #[test]
    fn test_nodata_cells_are_not_members() {
        let mut mask = mask_from(1, 3, &[(0, 0), (0, 1), (0, 2)], 1.0);
        mask.set_nodata(Some(1));
        let result = label_patches(&mask, PatchParams::default()).unwrap();
        assert_eq!(result.patch_count(), 0);
    }

    #[test]
    fn test_banding_does_not_change_labels() {
        // U shape whose arms only meet at the bottom row
        let rows = 9;
        let cols = 7;
        let mut cells = Vec::new();
        for r in 0..rows {
            cells.push((r, 0));
            cells.push((r, 6));
        }
        for c in 0..cols {
            cells.push((8, c));
        }
        // diagonal staircase crossing band seams
        for i in 0..5 {
            cells.push((i, 2 + i.min(3)));
        }
        cells.push((4, 3));
        let mask = mask_from(rows, cols, &cells, 1.0);

        let reference = label_banded(&mask, Connectivity::Eight, rows).unwrap();
        for band_rows in 1..rows {
            let banded = label_banded(&mask, Connectivity::Eight, band_rows).unwrap();
            assert_eq!(banded.counts, reference.counts, "band_rows {}", band_rows);
            assert_eq!(banded.labels.data(), reference.labels.data(), "band_rows {}", band_rows);
        }
        assert_eq!(reference.counts.len(), 2);
        assert_eq!(reference.labels.get(0, 0).unwrap(), reference.labels.get(0, 6).unwrap());
        assert_eq!(reference.labels.get(4, 3).unwrap(), 2);
    }

    #[test]
    fn test_empty_mask() {
        let mask = mask_from(5, 5, &[], 1.0);
        let result = label_patches(&mask, PatchParams::default()).unwrap();
        assert_eq!(result.patch_count(), 0);
        assert_eq!(result.area_grid(AreaUnits::default()).unwrap().valid_count(), 0);
    }
}
