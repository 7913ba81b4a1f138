//! Run configuration.
//!
//! A run is described by a table of indicator families. Each family lists its
//! indicators per year together with the constants that score them (remap
//! tables, class breaks, impact weights), so adding a year or a habitat is a
//! configuration change rather than new code.

use std::collections::HashSet;
use std::io::Read;

use lii_algorithms::classify::{RemapTable, ThresholdTable};
use lii_algorithms::landscape::AreaUnits;
use lii_algorithms::scoring::{CombineRule, NormalizeRange};
use lii_algorithms::statistics::CellStatistic;
use lii_core::raster::Connectivity;
use lii_parallel::ProcessingMode;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Configuration for a composite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Indicator families folded into the composite.
    pub families: Vec<FamilyConfig>,

    /// Final focal smoothing; `null` disables it.
    #[serde(default = "default_smoothing")]
    pub smoothing: Option<SmoothingConfig>,

    /// Extra composites returned besides the full one.
    #[serde(default)]
    pub scopes: OutputScopes,

    /// How indicators of one family and year are fanned out.
    #[serde(default)]
    pub processing: ProcessingMode,
}

fn default_smoothing() -> Option<SmoothingConfig> {
    Some(SmoothingConfig::default())
}

/// One indicator family ("grassland condition", "oil and gas stressors").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub name: String,

    /// Reduction across the family's indicators within a year.
    /// Defaults to the minimum (worst sub-condition).
    #[serde(default)]
    pub reducer: CellStatistic,

    pub indicators: Vec<IndicatorConfig>,
}

/// One scored layer of a family for one year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub name: String,

    /// Key of the input grid in the grid source.
    pub input: String,

    pub year: i32,

    pub method: IndicatorMethod,

    /// Turn negative scores (excluded classes) into NoData afterwards.
    #[serde(default = "default_true")]
    pub exclude_negative: bool,
}

fn default_true() -> bool {
    true
}

/// How an input grid becomes a score grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorMethod {
    /// Exact-match remap of categories.
    Remap { table: RemapTable },

    /// Class breaks over a measured grid.
    Thresholds { table: ThresholdTable },

    /// Patch area of the given categories, optionally scored by class breaks.
    PatchArea {
        categories: Vec<f64>,
        #[serde(default)]
        connectivity: Connectivity,
        #[serde(default)]
        units: AreaUnits,
        #[serde(default)]
        thresholds: Option<ThresholdTable>,
    },

    /// Distance to the given categories, optionally scored by class breaks.
    Connectivity {
        categories: Vec<f64>,
        #[serde(default)]
        max_distance: Option<f64>,
        #[serde(default)]
        thresholds: Option<ThresholdTable>,
    },

    /// Linear rescale of a continuous metric.
    Normalize {
        #[serde(default)]
        range: NormalizeRange,
        #[serde(default)]
        inverse: bool,
    },

    /// Log-decay of the distance to a stressor, weighted by its impact.
    Decay {
        categories: Vec<f64>,
        #[serde(default)]
        max_distance: Option<f64>,
        impact_weight: f64,
        #[serde(default)]
        rule: CombineRule,
    },
}

/// Units of the smoothing radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusUnits {
    Cells,
    #[default]
    Map,
}

/// Focal smoothing of the folded composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    pub radius: f64,

    #[serde(default)]
    pub units: RadiusUnits,

    /// Process in square tiles of this many cells with a halo; `None`
    /// smooths the whole grid in one row-parallel pass.
    #[serde(default)]
    pub tile_size: Option<usize>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            radius: 100.0,
            units: RadiusUnits::Map,
            tile_size: None,
        }
    }
}

/// Which extra composites a run returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputScopes {
    /// Unsmoothed composite of every year.
    #[serde(default)]
    pub per_year: bool,

    /// Smoothed multi-year composite of every family.
    #[serde(default)]
    pub per_family: bool,
}

impl PipelineConfig {
    /// Parse a JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration and validate it.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// All years named by any indicator, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .families
            .iter()
            .flat_map(|f| f.indicators.iter().map(|i| i.year))
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.families.is_empty() {
            return Err(config_error("at least one family is required"));
        }

        let mut family_names = HashSet::new();
        for family in &self.families {
            if !family_names.insert(family.name.as_str()) {
                return Err(config_error(format!("duplicate family '{}'", family.name)));
            }
            if family.indicators.is_empty() {
                return Err(config_error(format!("family '{}' has no indicators", family.name)));
            }

            let mut keys = HashSet::new();
            for indicator in &family.indicators {
                if !keys.insert((indicator.name.as_str(), indicator.year)) {
                    return Err(config_error(format!(
                        "family '{}' lists indicator '{}' twice for {}",
                        family.name, indicator.name, indicator.year
                    )));
                }
                indicator
                    .method
                    .validate()
                    .map_err(|reason| {
                        config_error(format!(
                            "{}/{}/{}: {}",
                            family.name, indicator.year, indicator.name, reason
                        ))
                    })?;
            }
        }

        if let Some(smoothing) = &self.smoothing {
            if !(smoothing.radius.is_finite() && smoothing.radius > 0.0) {
                return Err(config_error("smoothing radius must be > 0"));
            }
            if smoothing.tile_size == Some(0) {
                return Err(config_error("smoothing tile_size must be > 0"));
            }
        }
        if self.processing == ProcessingMode::ParallelWith(0) {
            return Err(config_error("processing thread count must be > 0"));
        }

        Ok(())
    }
}

impl IndicatorMethod {
    fn validate(&self) -> std::result::Result<(), String> {
        let categories_ok = |categories: &[f64]| {
            if categories.is_empty() {
                Err("categories must not be empty".to_string())
            } else {
                Ok(())
            }
        };
        let distance_ok = |max: &Option<f64>| match max {
            Some(d) if !(d.is_finite() && *d > 0.0) => {
                Err(format!("max_distance must be > 0, got {}", d))
            }
            _ => Ok(()),
        };
        let thresholds_ok = |t: &Option<ThresholdTable>| match t {
            Some(table) => table.validate().map_err(|e| e.to_string()),
            None => Ok(()),
        };

        match self {
            IndicatorMethod::Remap { table } => table.validate().map_err(|e| e.to_string()),
            IndicatorMethod::Thresholds { table } => table.validate().map_err(|e| e.to_string()),
            IndicatorMethod::PatchArea {
                categories,
                thresholds,
                ..
            } => {
                categories_ok(categories.as_slice())?;
                thresholds_ok(thresholds)
            }
            IndicatorMethod::Connectivity {
                categories,
                max_distance,
                thresholds,
            } => {
                categories_ok(categories.as_slice())?;
                distance_ok(max_distance)?;
                thresholds_ok(thresholds)
            }
            IndicatorMethod::Normalize { range, .. } => match range {
                NormalizeRange::Fixed { min, max } if !(max > min) => {
                    Err(format!("fixed range needs max > min, got [{}, {}]", min, max))
                }
                _ => Ok(()),
            },
            IndicatorMethod::Decay {
                categories,
                max_distance,
                impact_weight,
                ..
            } => {
                categories_ok(categories.as_slice())?;
                distance_ok(max_distance)?;
                if (0.0..=1.0).contains(impact_weight) {
                    Ok(())
                } else {
                    Err(format!("impact_weight must be in [0, 1], got {}", impact_weight))
                }
            }
        }
    }
}

fn config_error(msg: impl Into<String>) -> PipelineError {
    PipelineError::Config(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "families": [
            {
                "name": "grassland",
                "indicators": [
                    {
                        "name": "condition",
                        "input": "grass_condition_2016",
                        "year": 2016,
                        "method": {
                            "kind": "remap",
                            "table": { "entries": [[1, 0.2], [2, 0.6], [3, 1.0]], "nodata": { "value": -10 } }
                        }
                    },
                    {
                        "name": "patch_size",
                        "input": "nlcd_2016",
                        "year": 2016,
                        "method": {
                            "kind": "patch_area",
                            "categories": [71],
                            "units": "acres",
                            "thresholds": {
                                "classes": [
                                    { "upper": 320, "score": -10 },
                                    { "upper": 12108.16, "score": 0.75 },
                                    { "upper": 50004.245, "score": 0.95 }
                                ],
                                "above": 1
                            }
                        }
                    }
                ]
            },
            {
                "name": "stressors",
                "reducer": "minimum",
                "indicators": [
                    {
                        "name": "well_pads",
                        "input": "well_pads_2016",
                        "year": 2016,
                        "method": { "kind": "decay", "categories": [1], "max_distance": 4000, "impact_weight": 0.2 }
                    }
                ]
            },
            {
                "name": "landscape_metrics",
                "reducer": "mean",
                "indicators": [
                    {
                        "name": "clumpy",
                        "input": "clumpy_2019",
                        "year": 2019,
                        "method": { "kind": "normalize", "range": { "kind": "fixed", "min": -1, "max": 1 } }
                    }
                ]
            }
        ],
        "scopes": { "per_year": true }
    }"#;

    #[test]
    fn parses_full_configuration() {
        let config = PipelineConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.families.len(), 3);
        assert_eq!(config.years(), vec![2016, 2019]);
        assert_eq!(config.families[0].reducer, CellStatistic::Minimum);
        assert_eq!(config.families[2].reducer, CellStatistic::Mean);
        assert_eq!(config.smoothing, Some(SmoothingConfig::default()));
        assert!(config.scopes.per_year);
        assert!(!config.scopes.per_family);
        assert_eq!(config.processing, ProcessingMode::Parallel);

        let grass = &config.families[0].indicators;
        assert!(grass[0].exclude_negative);
        match &grass[1].method {
            IndicatorMethod::PatchArea {
                connectivity,
                units,
                thresholds,
                ..
            } => {
                assert_eq!(*connectivity, Connectivity::Eight);
                assert_eq!(*units, AreaUnits::Acres);
                assert_eq!(thresholds.as_ref().map(|t| t.classes.len()), Some(3));
            }
            other => panic!("unexpected method {:?}", other),
        }
    }

    #[test]
    fn round_trips_through_json() {
        let config = PipelineConfig::from_json_str(CONFIG).unwrap();
        let json = config.to_json_string().unwrap();
        let again = PipelineConfig::from_json_str(&json).unwrap();
        assert_eq!(again.years(), config.years());
        assert_eq!(again.families[1].name, "stressors");
    }

    #[test]
    fn null_smoothing_disables_it() {
        let json = r#"{
            "families": [{ "name": "f", "indicators": [
                { "name": "i", "input": "k", "year": 2020,
                  "method": { "kind": "normalize" } }
            ]}],
            "smoothing": null
        }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert!(config.smoothing.is_none());
    }

    #[test]
    fn rejects_bad_impact_weight() {
        let json = CONFIG.replace("\"impact_weight\": 0.2", "\"impact_weight\": 1.7");
        match PipelineConfig::from_json_str(&json) {
            Err(PipelineError::Config(msg)) => assert!(msg.contains("impact_weight"), "{}", msg),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_duplicate_indicator() {
        let mut config = PipelineConfig::from_json_str(CONFIG).unwrap();
        let dup = config.families[0].indicators[0].clone();
        config.families[0].indicators.push(dup);
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn rejects_bad_smoothing_and_empty_families() {
        let mut config = PipelineConfig::from_json_str(CONFIG).unwrap();
        config.smoothing = Some(SmoothingConfig {
            radius: 0.0,
            ..Default::default()
        });
        assert!(config.validate().is_err());

        config.smoothing = None;
        config.families.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ \"families\": [ }"),
            Err(PipelineError::Json(_))
        ));
    }
}
