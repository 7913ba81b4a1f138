//! Scoring of a single indicator

use lii_algorithms::classify::{category_mask, exclude_negative, reclassify, reclassify_thresholds};
use lii_algorithms::landscape::{distance_transform, patch_area, DistanceParams, PatchParams};
use lii_algorithms::scoring::{decay_combine_with, normalize, DecayParams, NormalizeParams};
use lii_core::{Grid, Result};

use crate::config::{IndicatorConfig, IndicatorMethod};

/// Score one input grid according to its indicator configuration
pub fn score_indicator(indicator: &IndicatorConfig, input: &Grid<f64>) -> Result<Grid<f64>> {
    let scored = match &indicator.method {
        IndicatorMethod::Remap { table } => reclassify(input, table)?,
        IndicatorMethod::Thresholds { table } => reclassify_thresholds(input, table)?,
        IndicatorMethod::PatchArea {
            categories,
            connectivity,
            units,
            thresholds,
        } => {
            let mask = category_mask(input, categories)?;
            let params = PatchParams {
                connectivity: *connectivity,
                units: *units,
            };
            let area = patch_area(&mask, params)?;
            match thresholds {
                Some(table) => reclassify_thresholds(&area, table)?,
                None => area,
            }
        }
        IndicatorMethod::Connectivity {
            categories,
            max_distance,
            thresholds,
        } => {
            let mask = category_mask(input, categories)?;
            let distance = distance_transform(
                &mask,
                DistanceParams {
                    max_distance: *max_distance,
                    ..Default::default()
                },
            )?;
            match thresholds {
                Some(table) => reclassify_thresholds(&distance, table)?,
                None => distance,
            }
        }
        IndicatorMethod::Normalize { range, inverse } => normalize(
            input,
            NormalizeParams {
                range: *range,
                inverse: *inverse,
            },
        )?,
        IndicatorMethod::Decay {
            categories,
            max_distance,
            impact_weight,
            rule,
        } => {
            let mask = category_mask(input, categories)?;
            let distance = distance_transform(
                &mask,
                DistanceParams {
                    max_distance: *max_distance,
                    ..Default::default()
                },
            )?;
            decay_combine_with(
                &distance,
                DecayParams {
                    impact_weight: *impact_weight,
                    rule: *rule,
                },
            )?
        }
    };

    if indicator.exclude_negative {
        exclude_negative(&scored)
    } else {
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lii_algorithms::classify::{NoDataScore, RemapTable, ThresholdClass, ThresholdTable};
    use lii_core::GeoTransform;

    fn indicator(method: IndicatorMethod) -> IndicatorConfig {
        IndicatorConfig {
            name: "test".into(),
            input: "input".into(),
            year: 2016,
            method,
            exclude_negative: true,
        }
    }

    fn landcover() -> Grid<f64> {
        // 30 m cells; grassland (71) in the west, shrub (52) in the east
        let mut g = Grid::from_vec(
            vec![
                71.0, 71.0, 52.0, 52.0, //
                71.0, 71.0, 52.0, 11.0, //
                71.0, 52.0, 52.0, 11.0,
            ],
            3,
            4,
        )
        .unwrap();
        g.set_transform(GeoTransform::square(0.0, 90.0, 30.0));
        g
    }

    #[test]
    fn remap_with_excluded_class() {
        let table = RemapTable::new(vec![(71.0, 1.0), (52.0, 0.5), (11.0, -10.0)])
            .with_nodata(NoDataScore::Value(-10.0));
        let out = score_indicator(&indicator(IndicatorMethod::Remap { table }), &landcover()).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(0, 3).unwrap(), 0.5);
        // open water scores -10 and is excluded
        assert!(out.get(1, 3).unwrap().is_nan());
    }

    #[test]
    fn patch_area_scored_by_breaks() {
        let thresholds = ThresholdTable::new(
            vec![ThresholdClass::below(3000.0, -10.0), ThresholdClass::below(6000.0, 0.75)],
            1.0,
        )
        .unwrap();
        let method = IndicatorMethod::PatchArea {
            categories: vec![71.0],
            connectivity: Default::default(),
            units: Default::default(),
            thresholds: Some(thresholds),
        };
        let out = score_indicator(&indicator(method), &landcover()).unwrap();
        // five grassland cells of 900 m2: 4500 m2
        assert_eq!(out.get(2, 0).unwrap(), 0.75);
        assert!(out.get(0, 3).unwrap().is_nan());
    }

    #[test]
    fn connectivity_keeps_negative_when_asked() {
        let thresholds = ThresholdTable::new(vec![ThresholdClass::at_most(60.0, 1.0)], -10.0).unwrap();
        let mut config = indicator(IndicatorMethod::Connectivity {
            categories: vec![71.0],
            max_distance: None,
            thresholds: Some(thresholds),
        });
        config.exclude_negative = false;
        let out = score_indicator(&config, &landcover()).unwrap();
        assert_eq!(out.get(0, 2).unwrap(), 1.0);
        assert_eq!(out.get(0, 3).unwrap(), 1.0);
        assert_eq!(out.get(1, 3).unwrap(), 1.0);
        // (2, 3) is about 67 m from the nearest grassland cell
        assert_eq!(out.get(2, 3).unwrap(), -10.0);
    }

    #[test]
    fn decay_of_open_water() {
        let method = IndicatorMethod::Decay {
            categories: vec![11.0],
            max_distance: Some(4000.0),
            impact_weight: 0.6,
            rule: Default::default(),
        };
        let out = score_indicator(&indicator(method), &landcover()).unwrap();
        assert_eq!(out.get(1, 3).unwrap(), 0.6);
        // nearest decayed distance normalizes to 0
        assert_eq!(out.get(0, 3).unwrap(), 0.0);
        assert!(out.data().iter().all(|v| (0.0..=0.6).contains(v)));
    }
}
