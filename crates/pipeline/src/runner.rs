//! Composite run: score, reduce, fold and smooth.
//!
//! For every year, each family's indicators are scored (fanned out on the
//! configured worker pool) and reduced with the family's reducer. The family
//! grids of a year are averaged into the year composite, and year composites
//! are averaged into the multi-year composite, which is smoothed once.
//!
//! Folds are incremental: an indicator grid is dropped once reduced, and a
//! year composite once added to the multi-year fold.

use std::collections::BTreeMap;
use std::time::Instant;

use lii_algorithms::statistics::{cell_statistics, CellAccumulator, CellStatistic};
use lii_core::Grid;
use lii_parallel::WorkerPool;
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::config::{FamilyConfig, IndicatorConfig, PipelineConfig};
use crate::error::{PipelineError, Result, Stage};
use crate::indicator::score_indicator;
use crate::smoothing::smooth;
use crate::source::GridSource;

/// Grids produced by a run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Multi-year, multi-family composite after smoothing
    pub composite: Grid<f64>,
    /// Multi-year, multi-family composite before smoothing
    pub unsmoothed: Grid<f64>,
    /// Year composites (unsmoothed), when requested
    pub per_year: BTreeMap<i32, Grid<f64>>,
    /// Multi-year family composites (smoothed), when requested
    pub per_family: BTreeMap<String, Grid<f64>>,
}

/// Configured composite run
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    pool: WorkerPool,
    cancel_flag: Option<CancelFlag>,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    ///
    /// The worker pool for indicator fan-out is built here and reused by
    /// every run.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.processing).map_err(PipelineError::Pool)?;
        Ok(Self {
            config,
            pool,
            cancel_flag: None,
        })
    }

    /// Stop the run at the next stage boundary once `flag` is set
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    fn check_cancelled(&self, after: impl FnOnce() -> String) -> Result<()> {
        match &self.cancel_flag {
            Some(flag) if flag.is_cancelled() => {
                let after = after();
                warn!(%after, "run cancelled");
                Err(PipelineError::Cancelled { after })
            }
            _ => Ok(()),
        }
    }

    /// Run the composite over grids supplied by `source`
    pub fn run<S: GridSource + ?Sized>(&self, source: &S) -> Result<PipelineOutput> {
        let started = Instant::now();
        let years = self.config.years();
        let scopes = self.config.scopes;
        info!(
            families = self.config.families.len(),
            years = years.len(),
            threads = self.pool.threads(),
            "starting composite run"
        );

        let mut composite = CellAccumulator::new(CellStatistic::Mean);
        let mut per_year = BTreeMap::new();
        let mut family_folds: BTreeMap<&str, CellAccumulator> = BTreeMap::new();

        for &year in &years {
            self.check_cancelled(|| format!("years before {}", year))?;
            let year_started = Instant::now();
            let mut year_fold = CellAccumulator::new(CellStatistic::Mean);

            for family in &self.config.families {
                let Some(family_grid) = self.score_family(family, year, source)? else {
                    continue;
                };

                year_fold.add(&family_grid).map_err(|e| {
                    PipelineError::stage(Stage::YearFold, format!("family={} year={}", family.name, year), e)
                })?;
                if scopes.per_family {
                    family_folds
                        .entry(family.name.as_str())
                        .or_insert_with(|| CellAccumulator::new(CellStatistic::Mean))
                        .add(&family_grid)
                        .map_err(|e| {
                            PipelineError::stage(
                                Stage::CompositeFold,
                                format!("family={} year={}", family.name, year),
                                e,
                            )
                        })?;
                }
            }

            if year_fold.is_empty() {
                warn!(year, "no family produced a grid for this year");
                continue;
            }
            let families = year_fold.len();
            let year_grid = year_fold
                .finish()
                .map_err(|e| PipelineError::stage(Stage::YearFold, format!("year={}", year), e))?;

            composite
                .add(&year_grid)
                .map_err(|e| PipelineError::stage(Stage::CompositeFold, format!("year={}", year), e))?;
            info!(
                year,
                families,
                elapsed_ms = year_started.elapsed().as_millis() as u64,
                "year folded"
            );
            if scopes.per_year {
                per_year.insert(year, year_grid);
            }
        }

        if composite.is_empty() {
            return Err(PipelineError::EmptyComposite);
        }
        let unsmoothed = composite
            .finish()
            .map_err(|e| PipelineError::stage(Stage::CompositeFold, "all years", e))?;

        self.check_cancelled(|| "composite fold".to_string())?;
        let composite = self.smooth(&unsmoothed, "composite")?;

        let mut per_family = BTreeMap::new();
        for (name, fold) in family_folds {
            self.check_cancelled(|| format!("smoothing before family {}", name))?;
            let grid = fold
                .finish()
                .map_err(|e| PipelineError::stage(Stage::CompositeFold, format!("family={}", name), e))?;
            per_family.insert(name.to_string(), self.smooth(&grid, name)?);
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            valid_cells = composite.valid_count(),
            "composite run finished"
        );

        Ok(PipelineOutput {
            composite,
            unsmoothed,
            per_year,
            per_family,
        })
    }

    /// Score and reduce one family's indicators for one year.
    /// `None` when the family has no indicator that year.
    fn score_family<S: GridSource + ?Sized>(
        &self,
        family: &FamilyConfig,
        year: i32,
        source: &S,
    ) -> Result<Option<Grid<f64>>> {
        let indicators: Vec<&IndicatorConfig> =
            family.indicators.iter().filter(|i| i.year == year).collect();
        if indicators.is_empty() {
            warn!(family = %family.name, year, "family has no indicators for this year");
            return Ok(None);
        }

        self.check_cancelled(|| format!("family {} before {}", family.name, year))?;
        let started = Instant::now();

        let scored: Vec<Result<Grid<f64>>> = self
            .pool
            .par_map(0..indicators.len(), |i| -> Result<Grid<f64>> {
                let indicator = indicators[i];
                let input = source.load(&indicator.input)?;
                debug!(input = %indicator.input, rows = input.rows(), cols = input.cols(), "loaded");
                score_indicator(indicator, &input).map_err(|e| {
                    PipelineError::stage(
                        Stage::Indicator,
                        format!("family={} year={} indicator={}", family.name, year, indicator.name),
                        e,
                    )
                })
            });

        let grids = scored.into_iter().collect::<Result<Vec<_>>>()?;
        let refs: Vec<&Grid<f64>> = grids.iter().collect();
        let reduced = cell_statistics(&refs, family.reducer).map_err(|e| {
            PipelineError::stage(Stage::FamilyReduce, format!("family={} year={}", family.name, year), e)
        })?;

        debug!(
            family = %family.name,
            year,
            indicators = grids.len(),
            reducer = ?family.reducer,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "family reduced"
        );
        Ok(Some(reduced))
    }

    fn smooth(&self, grid: &Grid<f64>, label: &str) -> Result<Grid<f64>> {
        let Some(config) = &self.config.smoothing else {
            return Ok(grid.clone());
        };
        let started = Instant::now();
        let out = smooth(grid, config)
            .map_err(|e| PipelineError::stage(Stage::Smooth, label.to_string(), e))?;
        debug!(
            scope = label,
            radius = config.radius,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "smoothed"
        );
        Ok(out)
    }
}
