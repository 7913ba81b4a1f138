//! # LII Pipeline
//!
//! Configuration-driven orchestration of the Landscape Integrity Index.
//!
//! A [`PipelineConfig`] lists indicator families and their per-year
//! indicators. [`Pipeline::run`] scores every indicator from grids supplied
//! by a [`GridSource`], reduces each family within a year (minimum by
//! default), averages families into year composites and years into the
//! multi-year composite, and applies the final focal smoothing.
//!
//! ```ignore
//! let config = PipelineConfig::from_json_reader(File::open("lii.json")?)?;
//! let output = Pipeline::new(config)?.run(&source)?;
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod indicator;
pub mod runner;
pub mod smoothing;
pub mod source;

pub use cancel::CancelFlag;
pub use config::{
    FamilyConfig, IndicatorConfig, IndicatorMethod, OutputScopes, PipelineConfig, RadiusUnits,
    SmoothingConfig,
};
pub use error::{PipelineError, Result, Stage};
pub use indicator::score_indicator;
pub use runner::{Pipeline, PipelineOutput};
pub use source::{GridSource, InMemorySource};
