//! Error types for pipeline runs

use std::fmt;

use thiserror::Error;

/// Pipeline step in which a grid operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Scoring one indicator
    Indicator,
    /// Reducing the indicators of one family within a year
    FamilyReduce,
    /// Averaging families into the year composite
    YearFold,
    /// Averaging years into the multi-year composite
    CompositeFold,
    /// Focal smoothing of a composite
    Smooth,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Indicator => "indicator",
            Stage::FamilyReduce => "family reduce",
            Stage::YearFold => "year fold",
            Stage::CompositeFold => "composite fold",
            Stage::Smooth => "smooth",
        };
        f.write_str(name)
    }
}

/// Errors that end a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A grid operation failed; `context` names the family, year and indicator.
    #[error("{stage} failed for {context}: {source}")]
    Stage {
        stage: Stage,
        context: String,
        #[source]
        source: lii_core::Error,
    },

    /// The grid source has no grid under this key.
    #[error("no input grid for key '{key}'")]
    MissingInput { key: String },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration could not be parsed.
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be read.
    #[error("configuration read error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled between stages.
    #[error("run cancelled after {after}")]
    Cancelled { after: String },

    /// No indicator produced a grid.
    #[error("no indicator produced a grid; the composite is empty")]
    EmptyComposite,

    /// The worker pool could not be built.
    #[error("worker pool error: {0}")]
    Pool(lii_core::Error),
}

impl PipelineError {
    pub(crate) fn stage(stage: Stage, context: impl Into<String>, source: lii_core::Error) -> Self {
        PipelineError::Stage {
            stage,
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
